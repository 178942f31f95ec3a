/// Runs the template helper of a [`RenderCx`](crate::RenderCx) over a literal
/// with `{}` placeholders.
///
/// Each argument is converted with [`Arg::from`](crate::Arg), so plain values,
/// nested templates and [`Callback`](crate::Callback)s can be mixed.
///
/// # Usage
///
/// ```ignore
/// fn render(&mut self, cx: &mut RenderCx<'_>) -> Renderable {
///     let count = cx.state().value("count");
///     html!(cx, "Count: {} <button onclick=\"{}\">+</button>", count,
///         Callback::method::<Counter, _>("increment", |_, cx, _| {
///             let next = cx.state().i64("count").unwrap_or(0) + 1;
///             cx.state().set("count", next);
///         }))
///     .into()
/// }
/// ```
#[macro_export]
macro_rules! html {
    ($cx:expr, $literal:expr $(, $arg:expr)* $(,)?) => {
        $cx.html().format($literal, [$($crate::Arg::from($arg)),*])
    };
}
