//! Translator protocols used by the scoped claim-mutate-publish helpers.
//!
//! A translator fills a pre-allocated slot with data for one publication.
//! The arity-specialized variants exist so arguments travel by value on the
//! hot path with no intermediate packaging; the vararg form takes a slice
//! when arity is dynamic.

/// Populate an event with no extra arguments.
pub trait EventTranslator<E>: Send + Sync {
    /// Fill `event`, which already occupies slot `sequence`.
    fn translate_to(&self, event: &mut E, sequence: i64);
}

/// Populate an event with one argument.
pub trait EventTranslatorOneArg<E, A>: Send + Sync {
    fn translate_to(&self, event: &mut E, sequence: i64, arg0: A);
}

/// Populate an event with two arguments.
pub trait EventTranslatorTwoArg<E, A, B>: Send + Sync {
    fn translate_to(&self, event: &mut E, sequence: i64, arg0: A, arg1: B);
}

/// Populate an event with three arguments.
pub trait EventTranslatorThreeArg<E, A, B, C>: Send + Sync {
    fn translate_to(&self, event: &mut E, sequence: i64, arg0: A, arg1: B, arg2: C);
}

/// Populate an event from a slice of homogeneous arguments.
pub trait EventTranslatorVararg<E, A>: Send + Sync {
    fn translate_to(&self, event: &mut E, sequence: i64, args: &[A]);
}

/// Closure adapter for [`EventTranslator`].
pub struct ClosureEventTranslator<E, F>
where
    F: Fn(&mut E, i64) + Send + Sync,
{
    translator_fn: F,
    _phantom: std::marker::PhantomData<E>,
}

impl<E, F> ClosureEventTranslator<E, F>
where
    F: Fn(&mut E, i64) + Send + Sync,
{
    pub fn new(translator_fn: F) -> Self {
        Self {
            translator_fn,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventTranslator<E> for ClosureEventTranslator<E, F>
where
    E: Send + Sync,
    F: Fn(&mut E, i64) + Send + Sync,
{
    fn translate_to(&self, event: &mut E, sequence: i64) {
        (self.translator_fn)(event, sequence);
    }
}

/// Closure adapter for [`EventTranslatorOneArg`].
pub struct ClosureEventTranslatorOneArg<E, A, F>
where
    F: Fn(&mut E, i64, A) + Send + Sync,
{
    translator_fn: F,
    _phantom: std::marker::PhantomData<(E, A)>,
}

impl<E, A, F> ClosureEventTranslatorOneArg<E, A, F>
where
    F: Fn(&mut E, i64, A) + Send + Sync,
{
    pub fn new(translator_fn: F) -> Self {
        Self {
            translator_fn,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<E, A, F> EventTranslatorOneArg<E, A> for ClosureEventTranslatorOneArg<E, A, F>
where
    E: Send + Sync,
    A: Send + Sync,
    F: Fn(&mut E, i64, A) + Send + Sync,
{
    fn translate_to(&self, event: &mut E, sequence: i64, arg0: A) {
        (self.translator_fn)(event, sequence, arg0);
    }
}

/// Closure adapter for [`EventTranslatorTwoArg`].
pub struct ClosureEventTranslatorTwoArg<E, A, B, F>
where
    F: Fn(&mut E, i64, A, B) + Send + Sync,
{
    translator_fn: F,
    _phantom: std::marker::PhantomData<(E, A, B)>,
}

impl<E, A, B, F> ClosureEventTranslatorTwoArg<E, A, B, F>
where
    F: Fn(&mut E, i64, A, B) + Send + Sync,
{
    pub fn new(translator_fn: F) -> Self {
        Self {
            translator_fn,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<E, A, B, F> EventTranslatorTwoArg<E, A, B> for ClosureEventTranslatorTwoArg<E, A, B, F>
where
    E: Send + Sync,
    A: Send + Sync,
    B: Send + Sync,
    F: Fn(&mut E, i64, A, B) + Send + Sync,
{
    fn translate_to(&self, event: &mut E, sequence: i64, arg0: A, arg1: B) {
        (self.translator_fn)(event, sequence, arg0, arg1);
    }
}

/// Closure adapter for [`EventTranslatorThreeArg`].
pub struct ClosureEventTranslatorThreeArg<E, A, B, C, F>
where
    F: Fn(&mut E, i64, A, B, C) + Send + Sync,
{
    translator_fn: F,
    _phantom: std::marker::PhantomData<(E, A, B, C)>,
}

impl<E, A, B, C, F> ClosureEventTranslatorThreeArg<E, A, B, C, F>
where
    F: Fn(&mut E, i64, A, B, C) + Send + Sync,
{
    pub fn new(translator_fn: F) -> Self {
        Self {
            translator_fn,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<E, A, B, C, F> EventTranslatorThreeArg<E, A, B, C>
    for ClosureEventTranslatorThreeArg<E, A, B, C, F>
where
    E: Send + Sync,
    A: Send + Sync,
    B: Send + Sync,
    C: Send + Sync,
    F: Fn(&mut E, i64, A, B, C) + Send + Sync,
{
    fn translate_to(&self, event: &mut E, sequence: i64, arg0: A, arg1: B, arg2: C) {
        (self.translator_fn)(event, sequence, arg0, arg1, arg2);
    }
}

/// Closure adapter for [`EventTranslatorVararg`].
pub struct ClosureEventTranslatorVararg<E, A, F>
where
    F: Fn(&mut E, i64, &[A]) + Send + Sync,
{
    translator_fn: F,
    _phantom: std::marker::PhantomData<(E, A)>,
}

impl<E, A, F> ClosureEventTranslatorVararg<E, A, F>
where
    F: Fn(&mut E, i64, &[A]) + Send + Sync,
{
    pub fn new(translator_fn: F) -> Self {
        Self {
            translator_fn,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<E, A, F> EventTranslatorVararg<E, A> for ClosureEventTranslatorVararg<E, A, F>
where
    E: Send + Sync,
    A: Send + Sync,
    F: Fn(&mut E, i64, &[A]) + Send + Sync,
{
    fn translate_to(&self, event: &mut E, sequence: i64, args: &[A]) {
        (self.translator_fn)(event, sequence, args);
    }
}

/// Build a zero-arg translator from a closure.
pub fn event_translator<E, F>(translator_fn: F) -> ClosureEventTranslator<E, F>
where
    F: Fn(&mut E, i64) + Send + Sync,
{
    ClosureEventTranslator::new(translator_fn)
}

/// Build a one-arg translator from a closure.
pub fn event_translator_one_arg<E, A, F>(translator_fn: F) -> ClosureEventTranslatorOneArg<E, A, F>
where
    F: Fn(&mut E, i64, A) + Send + Sync,
{
    ClosureEventTranslatorOneArg::new(translator_fn)
}

/// Build a two-arg translator from a closure.
pub fn event_translator_two_arg<E, A, B, F>(
    translator_fn: F,
) -> ClosureEventTranslatorTwoArg<E, A, B, F>
where
    F: Fn(&mut E, i64, A, B) + Send + Sync,
{
    ClosureEventTranslatorTwoArg::new(translator_fn)
}

/// Build a three-arg translator from a closure.
pub fn event_translator_three_arg<E, A, B, C, F>(
    translator_fn: F,
) -> ClosureEventTranslatorThreeArg<E, A, B, C, F>
where
    F: Fn(&mut E, i64, A, B, C) + Send + Sync,
{
    ClosureEventTranslatorThreeArg::new(translator_fn)
}

/// Build a vararg translator from a closure.
pub fn event_translator_vararg<E, A, F>(translator_fn: F) -> ClosureEventTranslatorVararg<E, A, F>
where
    F: Fn(&mut E, i64, &[A]) + Send + Sync,
{
    ClosureEventTranslatorVararg::new(translator_fn)
}
