//! Projections scope a reducer to one part of the state
//!
//! A [`Projection`] pairs a *select* function that borrows a sub-value out of
//! the full state with a *splice* function that rebuilds the full state with
//! that sub-value replaced (a "with-field" update). Projected reducers only
//! clone and reduce the selected part.

/// Select/splice pair addressing a sub-value `T` inside state `S`.
pub struct Projection<S, T> {
    select: Box<dyn Fn(&S) -> &T + Send + Sync>,
    splice: Box<dyn Fn(S, T) -> S + Send + Sync>,
}

impl<S, T> Projection<S, T> {
    /// Create a projection from a borrowing selector and a splice function.
    ///
    /// # Example
    ///
    /// ```rust
    /// use machine::Projection;
    ///
    /// #[derive(Clone)]
    /// struct Counter {
    ///     count: i64,
    ///     label: String,
    /// }
    ///
    /// let count = Projection::new(
    ///     |s: &Counter| &s.count,
    ///     |s: Counter, count| Counter { count, ..s },
    /// );
    /// let state = Counter { count: 2, label: "a".into() };
    /// assert_eq!(*count.select(&state), 2);
    /// assert_eq!(count.splice(state, 5).count, 5);
    /// ```
    pub fn new<Sel, Spl>(select: Sel, splice: Spl) -> Self
    where
        Sel: Fn(&S) -> &T + Send + Sync + 'static,
        Spl: Fn(S, T) -> S + Send + Sync + 'static,
    {
        Self {
            select: Box::new(select),
            splice: Box::new(splice),
        }
    }

    /// Borrow the projected sub-value.
    pub fn select<'a>(&self, state: &'a S) -> &'a T {
        (self.select)(state)
    }

    /// Rebuild `state` with the projected sub-value replaced by `value`.
    pub fn splice(&self, state: S, value: T) -> S {
        (self.splice)(state, value)
    }
}

impl<S, T> Projection<S, T>
where
    S: Clone,
    T: Clone,
{
    /// Apply `f` to a clone of the projected sub-value and splice the result
    /// into a clone of `state`. `state` itself is left untouched.
    pub fn update<F>(&self, state: &S, f: F) -> S
    where
        F: FnOnce(T) -> T,
    {
        let part = self.select(state).clone();
        let reduced = f(part);
        self.splice(state.clone(), reduced)
    }
}
