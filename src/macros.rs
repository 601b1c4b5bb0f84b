/// Call-site breadcrumb attached to `anyhow` contexts at fallible boundaries,
/// e.g. `.with_context(|| context!())`.
macro_rules! context {
    () => {
        format!("{}:{}:{}", file!(), line!(), column!())
    };
}
