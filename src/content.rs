//! Content script: drives a `PolicyEngine` against the live document
use crate::chrome;
use crate::engine::{Page, PolicyEngine};
use crate::error::{Error, Result, describe};
use crate::motivation::{QUOTE_CLASS, Quote};
use crate::sites::{ElementProbe, Marker, MarkerTarget, SCRUBBED_ATTR, ScrubRule, SiteProfile, profile_for_url};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, HtmlElement, MutationObserver, MutationObserverInit, Window};

type SharedEngine = Rc<RefCell<PolicyEngine<DomPage>>>;

/// `Page` over the real DOM via web-sys
pub struct DomPage {
    window: Window,
    document: Document,
}

impl DomPage {
    pub fn new() -> Result<Self> {
        let window = web_sys::window().ok_or(Error::PageNotReady("window"))?;
        let document = window.document().ok_or(Error::PageNotReady("document"))?;
        Ok(DomPage { window, document })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    fn quote_selector() -> String {
        format!(".{QUOTE_CLASS}")
    }

    fn elements(&self, selector: &str) -> Vec<HtmlElement> {
        let Ok(nodes) = self.document.query_selector_all(selector) else {
            return Vec::new();
        };
        (0..nodes.length())
            .filter_map(|index| nodes.get(index))
            .filter_map(|node| node.dyn_into::<HtmlElement>().ok())
            .collect()
    }

    fn build_quote(&self, quote: &Quote) -> Result<web_sys::Element> {
        let create = |class: &str, text: &str| -> Result<web_sys::Element> {
            let element = self
                .document
                .create_element("div")
                .map_err(|e| Error::Dom(describe(&e)))?;
            element.set_class_name(class);
            element.set_text_content(Some(text));
            Ok(element)
        };

        let container = create(QUOTE_CLASS, "")?;
        let text = create("quote-text", &format!("\u{201c}{}\u{201d}", quote.text))?;
        let author = create("quote-author", &format!("- {}", quote.author))?;
        container
            .append_child(&text)
            .and_then(|_| container.append_child(&author))
            .map_err(|e| Error::Dom(describe(&e)))?;
        Ok(container)
    }
}

impl Page for DomPage {
    fn href(&self) -> String {
        self.window.location().href().unwrap_or_default()
    }

    fn set_marker(&mut self, marker: &Marker, active: bool) {
        let outcome = match marker.target {
            MarkerTarget::RootAttribute => {
                let Some(root) = self.document.document_element() else {
                    return;
                };
                if active {
                    root.set_attribute(marker.name, "true")
                } else {
                    root.remove_attribute(marker.name)
                }
            }
            MarkerTarget::BodyClass => {
                // before DOMContentLoaded; the next pass picks it up
                let Some(body) = self.document.body() else {
                    return;
                };
                if active {
                    body.class_list().add_1(marker.name)
                } else {
                    body.class_list().remove_1(marker.name)
                }
            }
        };

        if let Err(err) = outcome {
            log::warn!("Could not set marker {}: {}", marker.name, describe(&err));
        }
    }

    fn has_quote(&self) -> bool {
        matches!(self.document.query_selector(&Self::quote_selector()), Ok(Some(_)))
    }

    fn insert_quote(&mut self, quote: &Quote, anchor: &str) {
        let Some(body) = self.document.body() else {
            return;
        };
        let element = match self.build_quote(quote) {
            Ok(element) => element,
            Err(err) => {
                log::warn!("Could not build quote: {err}");
                return;
            }
        };

        let placed = match self.document.query_selector(anchor) {
            Ok(Some(container)) => container.prepend_with_node_1(&element),
            _ => body.append_child(&element).map(|_| ()),
        };
        if let Err(err) = placed {
            log::warn!("Could not insert quote: {}", describe(&err));
        }
    }

    fn remove_quote(&mut self) {
        if let Ok(Some(element)) = self.document.query_selector(&Self::quote_selector()) {
            element.remove();
        }
    }

    fn scrub(&mut self, rule: &ScrubRule) -> usize {
        let mut hidden = 0;
        for element in self.elements(&rule.selector()) {
            if element.has_attribute(SCRUBBED_ATTR) || !rule.matches(&DomElement(&element)) {
                continue;
            }
            if element.style().set_property("display", "none").is_ok() {
                let _ = element.set_attribute(SCRUBBED_ATTR, "");
                hidden += 1;
            }
        }
        hidden
    }

    fn unscrub(&mut self, rule: &ScrubRule) -> usize {
        let elements = self.elements(&rule.scrubbed_selector());
        for element in &elements {
            let _ = element.style().remove_property("display");
            let _ = element.remove_attribute(SCRUBBED_ATTR);
        }
        elements.len()
    }

    fn replace_location(&mut self, url: &str) -> Result<()> {
        self.window
            .location()
            .replace(url)
            .map_err(|e| Error::Navigation(describe(&e)))
    }
}

/// `ElementProbe` over a live element
struct DomElement<'a>(&'a HtmlElement);

impl ElementProbe for DomElement<'_> {
    fn text(&self) -> String {
        self.0.inner_text()
    }

    fn aria_label(&self) -> Option<String> {
        self.0.get_attribute("aria-label")
    }

    fn has_descendant(&self, selector: &str) -> bool {
        matches!(self.0.query_selector(selector), Ok(Some(_)))
    }
}

/// Boot the engine for whichever supported site this page belongs to.
///
/// Nothing is applied until the stored settings have been read or the read
/// has failed.
pub fn start() -> Result<()> {
    let page = DomPage::new()?;
    let href = page.href();
    let Some(profile) = profile_for_url(&href) else {
        log::debug!("No site profile for {href}");
        return Ok(());
    };
    log::info!("{}: policy engine starting", profile.name);

    let document = page.document().clone();
    let engine: SharedEngine = Rc::new(RefCell::new(PolicyEngine::new(profile, page)));

    spawn_local(async move {
        let keys = profile.storage_keys();
        let snapshot = match chrome::load_snapshot(Some(keys.as_slice())).await {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                log::warn!("{}: {err}", profile.name);
                None
            }
        };
        engine.borrow_mut().initialize(snapshot.as_ref());

        {
            let engine = engine.clone();
            chrome::subscribe(move |changes| {
                if let Ok(mut engine) = engine.try_borrow_mut() {
                    engine.on_settings_changed(&changes);
                }
            })
            .keep_alive();
        }

        listen_for_navigation(profile, &engine);
        if let Err(err) = observe_when_ready(document, engine) {
            log::error!("{}: mutation observer not started: {err}", profile.name);
        }
    });
    Ok(())
}

fn listen_for_navigation(profile: &'static SiteProfile, engine: &SharedEngine) {
    let Some(window) = web_sys::window() else {
        return;
    };

    for event in profile.navigation_events {
        let engine = engine.clone();
        let callback = Closure::<dyn FnMut()>::new(move || {
            if let Ok(mut engine) = engine.try_borrow_mut() {
                engine.on_navigated();
            }
        });
        if let Err(err) = window.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref()) {
            log::warn!("Could not listen for {event}: {}", describe(&err));
        }
        callback.forget();
    }
}

/// Watch the body subtree; waits for `DOMContentLoaded` when run at document start
fn observe_when_ready(document: Document, engine: SharedEngine) -> Result<()> {
    if document.ready_state() != "loading" {
        return observe_mutations(&document, engine);
    }

    let ready_document = document.clone();
    let on_ready = Closure::once(move || {
        if let Ok(mut engine) = engine.try_borrow_mut() {
            engine.on_dom_mutated();
        }
        if let Err(err) = observe_mutations(&ready_document, engine) {
            log::error!("Mutation observer not started: {err}");
        }
    });
    document
        .add_event_listener_with_callback("DOMContentLoaded", on_ready.as_ref().unchecked_ref())
        .map_err(|e| Error::Dom(describe(&e)))?;
    on_ready.forget();
    Ok(())
}

fn observe_mutations(document: &Document, engine: SharedEngine) -> Result<()> {
    let body = document.body().ok_or(Error::PageNotReady("body"))?;

    let callback = Closure::<dyn FnMut()>::new(move || {
        // a pass that is already running triggers mutations of its own
        if let Ok(mut engine) = engine.try_borrow_mut() {
            engine.on_dom_mutated();
        }
    });
    let observer = MutationObserver::new(callback.as_ref().unchecked_ref())
        .map_err(|e| Error::Dom(describe(&e)))?;

    let options = MutationObserverInit::new();
    options.set_child_list(true);
    options.set_subtree(true);
    observer
        .observe_with_options(&body, &options)
        .map_err(|e| Error::Dom(describe(&e)))?;

    callback.forget();
    Ok(())
}
