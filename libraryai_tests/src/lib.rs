#[cfg(all(test, feature = "system_tests"))]
mod system_tests;

/// Address of the running catalog service, `LIBRARYAI_API_URL` or the local default
pub fn catalog_url() -> String {
    std::env::var("LIBRARYAI_API_URL").unwrap_or("http://127.0.0.1:3055".to_string())
}
