//! Path loading from a URL parameter, a local file, or the built-in demo

use bevy::prelude::*;
use disha_core::{OrderedWaypointPath, PathError};
use std::sync::{Arc, Mutex};

use crate::app::LoadedPath;

/// Demo path used when the page has no `?path=` parameter
pub const DEMO_PATH_JSON: &str = r#"{
    "start_pos": {"x": 0, "y": 0, "z": 0},
    "waypoints": [
        {"x": 0, "y": 0, "z": -3},
        {"x": 2, "y": 0, "z": -5},
        {"x": 2, "y": 1, "z": -8},
        {"x": -1, "y": 1, "z": -10}
    ]
}"#;

pub struct PathLoaderPlugin;

impl Plugin for PathLoaderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingPathLoad>()
            .add_systems(Startup, check_url_parameter)
            .add_systems(Update, process_pending_loads);
    }
}

/// Results of asynchronous loads, filled in from browser callbacks
#[derive(Resource, Default, Clone)]
pub struct PendingPathLoad {
    pub data: Arc<Mutex<Option<String>>>,
    pub source: Arc<Mutex<Option<String>>>,
    pub error: Arc<Mutex<Option<String>>>,
}

impl PendingPathLoad {
    fn complete(&self, content: String, source: String) {
        if let Ok(mut data) = self.data.lock() {
            *data = Some(content);
        }
        if let Ok(mut slot) = self.source.lock() {
            *slot = Some(source);
        }
    }

    fn fail(&self, message: String) {
        if let Ok(mut error) = self.error.lock() {
            *error = Some(message);
        }
    }
}

/// Parse a path document, keeping the previous path on failure
pub fn parse_path(content: &str) -> Result<OrderedWaypointPath, PathError> {
    OrderedWaypointPath::from_json(content)
}

/// Check URL for ?path= parameter on startup, otherwise load the demo
fn check_url_parameter(mut loaded: ResMut<LoadedPath>, pending: Res<PendingPathLoad>) {
    #[cfg(target_arch = "wasm32")]
    {
        let path_url = web_sys::window()
            .and_then(|w| w.location().href().ok())
            .and_then(|href| web_sys::Url::new(&href).ok())
            .and_then(|url| url.search_params().get("path"));

        if let Some(path_url) = path_url {
            tracing::info!("Loading path from URL parameter: {}", path_url);
            loaded.loading = true;
            loaded.source = Some(path_url.clone());

            let pending = pending.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match fetch_path(&path_url).await {
                    Ok(content) => pending.complete(content, path_url),
                    Err(e) => pending.fail(e),
                }
            });
            return;
        }
    }

    tracing::info!("No path parameter, loading demo path");
    pending.complete(DEMO_PATH_JSON.to_string(), "demo".to_string());
    loaded.loading = true;
}

/// Download a path document from the vision backend or any static host
#[cfg(target_arch = "wasm32")]
async fn fetch_path(url: &str) -> Result<String, String> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    let window = web_sys::window().ok_or("Path download needs a browser window")?;

    let response: web_sys::Response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| format!("Could not reach path server at {}: {:?}", url, e))?
        .dyn_into()
        .map_err(|_| format!("Unexpected fetch result for {}", url))?;

    if !response.ok() {
        return Err(format!(
            "Path server answered {} {} for {}",
            response.status(),
            response.status_text(),
            url
        ));
    }

    let body = response
        .text()
        .map_err(|e| format!("Path response from {} has no body: {:?}", url, e))?;
    JsFuture::from(body)
        .await
        .map_err(|e| format!("Reading path response from {} failed: {:?}", url, e))?
        .as_string()
        .ok_or_else(|| format!("Path response from {} is not text", url))
}

/// Move completed loads into `LoadedPath`
fn process_pending_loads(mut loaded: ResMut<LoadedPath>, pending: Res<PendingPathLoad>) {
    if let Ok(mut data) = pending.data.try_lock() {
        if let Some(content) = data.take() {
            let source = pending.source.lock().ok().and_then(|mut s| s.take());
            loaded.loading = false;
            match parse_path(&content) {
                Ok(path) => {
                    tracing::info!(
                        waypoints = path.waypoints.len(),
                        source = source.as_deref().unwrap_or("unknown"),
                        "Path loaded"
                    );
                    loaded.path = Some(path);
                    loaded.source = source;
                    loaded.error = None;
                }
                Err(e) => {
                    tracing::warn!("Rejected path document: {}", e);
                    loaded.error = Some(e.to_string());
                }
            }
        }
    }

    if let Ok(mut error) = pending.error.try_lock() {
        if let Some(e) = error.take() {
            tracing::warn!("Path load failed: {}", e);
            loaded.loading = false;
            loaded.error = Some(e);
        }
    }
}

/// Open a file dialog and load the chosen path JSON
#[cfg(target_arch = "wasm32")]
pub fn open_path_file(pending: &PendingPathLoad) {
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use web_sys::{FileReader, HtmlInputElement};

    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        tracing::error!("open_path_file: no document");
        return;
    };

    let input: HtmlInputElement = match document
        .create_element("input")
        .ok()
        .and_then(|el| el.dyn_into().ok())
    {
        Some(input) => input,
        None => {
            tracing::error!("open_path_file: failed to create input element");
            return;
        }
    };
    input.set_type("file");
    input.set_accept(".json,application/json");
    let _ = input.style().set_property("display", "none");

    // Must be in the DOM for click() to work in many browsers
    let Some(body) = document.body() else {
        tracing::error!("open_path_file: no document body");
        return;
    };
    if let Err(e) = body.append_child(&input) {
        tracing::error!("open_path_file: failed to append input: {:?}", e);
        return;
    }

    let pending = pending.clone();
    let input_for_removal = input.clone();

    let on_change = Closure::wrap(Box::new(move |event: web_sys::Event| {
        let Some(input) = event
            .target()
            .and_then(|t| t.dyn_into::<HtmlInputElement>().ok())
        else {
            return;
        };
        input_for_removal.remove();

        let Some(file) = input.files().and_then(|files| files.get(0)) else {
            return;
        };
        let filename = file.name();
        tracing::info!("Path file selected: {}", filename);

        let reader = match FileReader::new() {
            Ok(r) => r,
            Err(e) => {
                tracing::error!("Failed to create FileReader: {:?}", e);
                return;
            }
        };

        let pending = pending.clone();
        let on_load = Closure::wrap(Box::new(move |event: web_sys::Event| {
            let Some(reader) = event
                .target()
                .and_then(|t| t.dyn_into::<FileReader>().ok())
            else {
                return;
            };
            match reader.result() {
                Ok(result) => match result.as_string() {
                    Some(content) => pending.complete(content, filename.clone()),
                    None => pending.fail(format!("{} is not a text file", filename)),
                },
                Err(e) => pending.fail(format!("Read error: {:?}", e)),
            }
        }) as Box<dyn FnMut(_)>);

        reader.set_onload(Some(on_load.as_ref().unchecked_ref()));
        on_load.forget();

        let _ = reader.read_as_text(&file);
    }) as Box<dyn FnMut(_)>);

    input.set_onchange(Some(on_change.as_ref().unchecked_ref()));
    on_change.forget();

    input.click();
}

#[cfg(not(target_arch = "wasm32"))]
pub fn open_path_file(_pending: &PendingPathLoad) {
    tracing::warn!("File dialogs are only available in the browser");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_path_parses() {
        let path = parse_path(DEMO_PATH_JSON).unwrap();
        assert_eq!(path.waypoints.len(), 4);
        assert_eq!(path.start, disha_core::Waypoint::ORIGIN);
    }

    #[test]
    fn test_missing_field_rejected() {
        let err = parse_path(r#"{"start_pos": {"x": 0, "y": 0, "z": 0}}"#).unwrap_err();
        assert!(matches!(err, PathError::MissingField("waypoints")));
    }

    #[test]
    fn test_failed_load_keeps_previous_path() {
        let mut app = App::new();
        app.init_resource::<LoadedPath>()
            .init_resource::<PendingPathLoad>()
            .add_systems(Update, process_pending_loads);

        let pending = app.world().resource::<PendingPathLoad>().clone();
        pending.complete(DEMO_PATH_JSON.to_string(), "demo".to_string());
        app.update();
        assert!(app.world().resource::<LoadedPath>().path.is_some());

        pending.complete("{}".to_string(), "broken.json".to_string());
        app.update();
        let loaded = app.world().resource::<LoadedPath>();
        assert_eq!(loaded.path.as_ref().map(|p| p.waypoints.len()), Some(4));
        assert_eq!(loaded.source.as_deref(), Some("demo"));
        assert!(loaded.error.is_some());
        assert!(!loaded.loading);
    }
}
