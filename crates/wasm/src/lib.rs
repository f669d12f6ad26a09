//! Browser bridge. The page-initialisation script constructs one
//! [`ChromeController`] and one [`FilterController`] and hands them to
//! whatever needs them; nothing here lives in a global.

mod chrome;
mod filters;

use facetbar_core::report::CallbackError;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

pub use chrome::ChromeController;
pub use filters::FilterController;

/// Route `log` output to the browser console and install the panic hook.
/// `level` is one of `error`, `warn`, `info`, `debug`, `trace`; default `info`.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(level: Option<String>) {
    console_error_panic_hook::set_once();
    let level = level
        .as_deref()
        .and_then(|l| l.parse::<log::Level>().ok())
        .unwrap_or(log::Level::Info);
    wasm_logger::init(wasm_logger::Config::new(level));
}

fn to_js_error(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

/// Best-effort message from a thrown JS value.
fn describe(value: &JsValue) -> String {
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

fn call1(f: &js_sys::Function, arg: &JsValue) -> Result<(), CallbackError> {
    f.call1(&JsValue::NULL, arg)
        .map(|_| ())
        .map_err(|thrown| CallbackError::new(describe(&thrown)))
}
