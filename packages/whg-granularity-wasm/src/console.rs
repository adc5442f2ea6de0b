// Console output for the worker. Inside the browser this goes to the devtools
// console; native builds (tests) write to stderr instead.

#[cfg(target_arch = "wasm32")]
pub fn log(s: &str) {
    web_sys::console::log_1(&s.into());
}

#[cfg(target_arch = "wasm32")]
pub fn warn(s: &str) {
    web_sys::console::warn_1(&s.into());
}

#[cfg(target_arch = "wasm32")]
pub fn error(s: &str) {
    web_sys::console::error_1(&s.into());
}

#[cfg(not(target_arch = "wasm32"))]
pub fn log(s: &str) {
    eprintln!("{}", s);
}

#[cfg(not(target_arch = "wasm32"))]
pub fn warn(s: &str) {
    eprintln!("warning: {}", s);
}

#[cfg(not(target_arch = "wasm32"))]
pub fn error(s: &str) {
    eprintln!("error: {}", s);
}

// Note: The console_* macros are defined in lib.rs so every module can use them
