//! Browser host: boots a compiled Elm-style module with LocalStorage saves
//!
//! The module is the JS object exposing `init({ node, flags })`; the app it
//! returns must expose `ports.setStorage.subscribe(callback)`.
//!
//! ```js
//! import init, { mount } from './pkg/shuffle_bridge.js';
//! const { Elm } = require('./Main.elm');
//! await init();
//! const app = mount(Elm.Main);
//! ```

use js_sys::{Function, JSON, Object, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::app::{AppInstance, Application, MountPoint};
use crate::error::{BridgeError, Result};
use crate::persistence::{PersistenceBridge, Port};
use crate::platform::LocalStorage;
use crate::settings::BridgeConfig;
use crate::snapshot::{InitialFlags, Snapshot};

/// Name of the outbound port the app saves through
const SAVE_PORT: &str = "setStorage";

/// A compiled app module, e.g. `Elm.Main`
pub struct ElmModule {
    module: JsValue,
}

impl ElmModule {
    pub fn new(module: JsValue) -> Self {
        Self { module }
    }
}

/// A running app and the port its saves arrive on
pub struct ElmApp {
    app: JsValue,
    port: Port<Snapshot>,
}

impl ElmApp {
    /// The JS app object returned by `init`
    pub fn js(&self) -> &JsValue {
        &self.app
    }
}

impl AppInstance for ElmApp {
    fn save_port(&self) -> &Port<Snapshot> {
        &self.port
    }
}

impl Application for ElmModule {
    type Instance = ElmApp;

    fn init(self, mount: &MountPoint, flags: InitialFlags) -> Result<ElmApp> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| BridgeError::Init("no document".to_string()))?;
        let node = document
            .get_element_by_id(mount.id())
            .ok_or_else(|| BridgeError::MountNotFound(mount.id().to_string()))?;

        let flags = match flags {
            Some(snapshot) => JSON::parse(&snapshot.to_text()).map_err(init_error)?,
            None => JsValue::NULL,
        };

        let options = Object::new();
        Reflect::set(&options, &"node".into(), &node).map_err(init_error)?;
        Reflect::set(&options, &"flags".into(), &flags).map_err(init_error)?;

        let init: Function = Reflect::get(&self.module, &"init".into())
            .map_err(init_error)?
            .dyn_into()
            .map_err(|_| BridgeError::Init("module has no init function".to_string()))?;
        let app = init.call1(&self.module, &options).map_err(init_error)?;

        let port = Port::new();
        forward_save_port(&app, port.clone())?;

        Ok(ElmApp { app, port })
    }
}

/// Subscribe to `app.ports.setStorage` and re-publish each value on `port`
fn forward_save_port(app: &JsValue, port: Port<Snapshot>) -> Result<()> {
    let ports = Reflect::get(app, &"ports".into()).map_err(init_error)?;
    let save_port = if ports.is_object() {
        Reflect::get(&ports, &SAVE_PORT.into()).map_err(init_error)?
    } else {
        JsValue::UNDEFINED
    };
    if save_port.is_undefined() {
        // Elm drops ports the app never uses
        log::warn!("App has no {} port, state will not be saved", SAVE_PORT);
        return Ok(());
    }

    let subscribe: Function = Reflect::get(&save_port, &"subscribe".into())
        .map_err(init_error)?
        .dyn_into()
        .map_err(|_| BridgeError::Init(format!("{SAVE_PORT} is not an outbound port")))?;

    let closure = Closure::<dyn FnMut(JsValue)>::new(move |state: JsValue| {
        let text = match JSON::stringify(&state) {
            Ok(text) => text.as_string(),
            Err(e) => {
                log::error!("Cannot encode saved state: {}", js_message(&e));
                return;
            }
        };
        let Some(text) = text else {
            log::error!("Cannot encode saved state: value is not JSON");
            return;
        };
        match Snapshot::from_text(&text) {
            Ok(snapshot) => port.send(snapshot),
            Err(e) => log::error!("Cannot encode saved state: {}", e),
        }
    });
    subscribe
        .call1(&save_port, closure.as_ref().unchecked_ref())
        .map_err(init_error)?;
    // The subscription lives as long as the page
    closure.forget();

    Ok(())
}

/// Restore the saved state from LocalStorage, start `module` on `#main`,
/// and keep saving whatever it sends through `setStorage`.
///
/// Returns the app object `module.init` produced.
#[wasm_bindgen]
pub fn mount(module: JsValue) -> std::result::Result<JsValue, JsValue> {
    mount_with(module, BridgeConfig::default())
}

/// Like [`mount`] with a custom storage key and mount id
#[wasm_bindgen(js_name = mountWith)]
pub fn mount_with_options(
    module: JsValue,
    storage_key: String,
    mount_id: String,
) -> std::result::Result<JsValue, JsValue> {
    let config = BridgeConfig::default()
        .with_storage_key(storage_key)
        .with_mount_id(mount_id);
    mount_with(module, config)
}

fn mount_with(module: JsValue, config: BridgeConfig) -> std::result::Result<JsValue, JsValue> {
    let start = || -> Result<JsValue> {
        let storage = LocalStorage::from_window()?;
        let running = PersistenceBridge::new(storage, config).start(ElmModule::new(module))?;
        Ok(running.instance().js().clone())
    };
    start().map_err(|e| {
        log::error!("Failed to start app: {}", e);
        JsValue::from(js_sys::Error::new(&e.to_string()))
    })
}

fn init_error(e: JsValue) -> BridgeError {
    BridgeError::Init(js_message(&e))
}

/// Best-effort text for a thrown JS value (DOMException name + message)
pub(crate) fn js_message(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    let name = Reflect::get(value, &"name".into())
        .ok()
        .and_then(|v| v.as_string());
    let message = Reflect::get(value, &"message".into())
        .ok()
        .and_then(|v| v.as_string());
    match (name, message) {
        (Some(name), Some(message)) => format!("{name}: {message}"),
        (None, Some(message)) => message,
        (Some(name), None) => name,
        (None, None) => format!("{value:?}"),
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use crate::platform::StorageBackend;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn js(body: &str) -> JsValue {
        Function::new_no_args(body).call0(&JsValue::NULL).unwrap()
    }

    fn get(value: &JsValue, path: &[&str]) -> JsValue {
        path.iter().fold(value.clone(), |v, key| {
            Reflect::get(&v, &(*key).into()).unwrap()
        })
    }

    /// Stand-in for `Elm.Main`; records init options and the save callback in `calls`
    fn fake_module(with_save_port: bool) -> JsValue {
        let ports = if with_save_port {
            "{ setStorage: { subscribe(cb) { calls.save = cb; } } }"
        } else {
            "{}"
        };
        js(&format!(
            r#"
            const calls = {{ options: null, save: null }};
            return {{
                calls,
                init(options) {{
                    calls.options = options;
                    return {{ ports: {ports} }};
                }},
            }};"#
        ))
    }

    fn add_mount(id: &str) {
        js(&format!(
            "const el = document.createElement('div'); el.id = '{id}'; document.body.appendChild(el); return null;"
        ));
    }

    fn send_save(module: &JsValue, state: &str) {
        let save: Function = get(module, &["calls", "save"]).dyn_into().unwrap();
        save.call1(&JsValue::NULL, &js(&format!("return {state};")))
            .unwrap();
    }

    #[wasm_bindgen_test]
    fn init_passes_node_and_flags() {
        add_mount("mount-flags");
        let module = fake_module(true);

        let flags = Some(Snapshot::new(json!({ "count": 3 })));
        ElmModule::new(module.clone())
            .init(&MountPoint::new("mount-flags"), flags)
            .unwrap();

        let options = get(&module, &["calls", "options"]);
        assert_eq!(
            get(&options, &["node", "id"]).as_string().as_deref(),
            Some("mount-flags")
        );
        assert_eq!(get(&options, &["flags", "count"]).as_f64(), Some(3.0));
    }

    #[wasm_bindgen_test]
    fn init_without_saved_state_passes_null() {
        add_mount("mount-null");
        let module = fake_module(true);

        ElmModule::new(module.clone())
            .init(&MountPoint::new("mount-null"), None)
            .unwrap();

        assert!(get(&module, &["calls", "options", "flags"]).is_null());
    }

    #[wasm_bindgen_test]
    fn init_missing_mount_fails() {
        let result = ElmModule::new(fake_module(true)).init(&MountPoint::new("nowhere"), None);
        assert!(matches!(result, Err(BridgeError::MountNotFound(id)) if id == "nowhere"));
    }

    #[wasm_bindgen_test]
    fn save_port_values_reach_rust_port() {
        add_mount("mount-port");
        let module = fake_module(true);
        let app = ElmModule::new(module.clone())
            .init(&MountPoint::new("mount-port"), None)
            .unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        app.save_port()
            .subscribe(move |s: &Snapshot| sink.borrow_mut().push(s.clone()));

        send_save(&module, "{ count: 4 }");
        assert_eq!(*seen.borrow(), vec![Snapshot::new(json!({ "count": 4 }))]);
    }

    #[wasm_bindgen_test]
    fn missing_save_port_still_starts() {
        add_mount("mount-no-port");
        let module = fake_module(false);

        let app = ElmModule::new(module.clone())
            .init(&MountPoint::new("mount-no-port"), None);

        assert!(app.is_ok());
        assert!(get(&module, &["calls", "save"]).is_null());
    }

    #[wasm_bindgen_test]
    fn mount_restores_and_saves_local_storage() {
        const KEY: &str = "shuffle-test-mount";
        add_mount("mount-storage");
        let storage = LocalStorage::from_window().unwrap();
        storage.set(KEY, r#"{"count":3}"#).unwrap();
        let module = fake_module(true);

        mount_with_options(module.clone(), KEY.to_string(), "mount-storage".to_string())
            .unwrap();
        assert_eq!(
            get(&module, &["calls", "options", "flags", "count"]).as_f64(),
            Some(3.0)
        );

        send_save(&module, "{ count: 4 }");
        assert_eq!(storage.get(KEY).unwrap().as_deref(), Some(r#"{"count":4}"#));
        storage.remove(KEY).unwrap();
    }

    #[wasm_bindgen_test]
    fn mount_rejects_corrupt_save() {
        const KEY: &str = "shuffle-test-corrupt";
        add_mount("mount-corrupt");
        let storage = LocalStorage::from_window().unwrap();
        storage.set(KEY, "{not json").unwrap();
        let module = fake_module(true);

        let result = mount_with_options(module.clone(), KEY.to_string(), "mount-corrupt".to_string());

        assert!(result.is_err());
        assert!(get(&module, &["calls", "options"]).is_null());
        storage.remove(KEY).unwrap();
    }
}
