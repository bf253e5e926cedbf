/// A function invoked with its arguments packed in a tuple.
///
/// Lets one wrapper type cover functions of any arity up to six:
/// `timed.call(())`, `timed.call((a,))`, `timed.call((a, b))`, ...
pub trait Callable<Args> {
    type Output;

    fn invoke(&self, args: Args) -> Self::Output;
}

macro_rules! impl_callable {
    ($($ty:ident $arg:ident),*) => {
        impl<F, R, $($ty,)*> Callable<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> R,
        {
            type Output = R;

            #[inline]
            fn invoke(&self, ($($arg,)*): ($($ty,)*)) -> R {
                self($($arg),*)
            }
        }
    };
}

impl_callable!();
impl_callable!(A1 a1);
impl_callable!(A1 a1, A2 a2);
impl_callable!(A1 a1, A2 a2, A3 a3);
impl_callable!(A1 a1, A2 a2, A3 a3, A4 a4);
impl_callable!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
impl_callable!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);

/// Placeholder for functions whose name cannot be discovered.
pub const ANONYMOUS: &str = "<anonymous>";

/// Best-effort name of a function item: the last path segment of its type
/// name. Closures, function pointers and trait objects have no usable name.
pub(crate) fn name_of<F>() -> &'static str {
    let full = std::any::type_name::<F>();
    if full.contains("{{closure}}") || full.contains(' ') || full.contains('(') {
        return ANONYMOUS;
    }
    let path = full.split('<').next().unwrap_or(full);
    path.rsplit("::")
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or(ANONYMOUS)
}
