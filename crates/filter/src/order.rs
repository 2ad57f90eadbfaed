/// The priority of a filter; lower values run first on the request path and last on the
/// response path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterOrder {
    /// a value fixed at registration
    Fixed(i32),
    /// ask the filter itself through its `order()` method
    #[default]
    Dynamic,
}

impl FilterOrder {
    pub const HIGHEST_PRECEDENCE: i32 = i32::MIN;
    pub const LOWEST_PRECEDENCE: i32 = i32::MAX;

    pub fn highest() -> Self {
        Self::Fixed(Self::HIGHEST_PRECEDENCE)
    }

    pub fn lowest() -> Self {
        Self::Fixed(Self::LOWEST_PRECEDENCE)
    }

    /// Resolves the order value, asking `dynamic` only for [`FilterOrder::Dynamic`].
    #[inline]
    pub fn resolve<F: FnOnce() -> i32>(self, dynamic: F) -> i32 {
        match self {
            Self::Fixed(order) => order,
            Self::Dynamic => dynamic(),
        }
    }
}

impl From<i32> for FilterOrder {
    fn from(order: i32) -> Self {
        Self::Fixed(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_order_ignores_the_filter() {
        assert_eq!(FilterOrder::Fixed(10).resolve(|| panic!("should not ask")), 10);
        assert_eq!(FilterOrder::Dynamic.resolve(|| 42), 42);
        assert_eq!(FilterOrder::from(-3), FilterOrder::Fixed(-3));
    }

    #[test]
    fn precedence_bounds() {
        assert!(FilterOrder::highest().resolve(|| 0) < FilterOrder::lowest().resolve(|| 0));
    }
}
