//! Popup UI for Social Sentry

use crate::chrome;
use crate::settings::SettingKey;
use crate::snooze::{PopupState, SnoozeChoice};
use crate::storage::{SettingsPatch, StorageSnapshot};
use crate::ui::components::{Countdown, ToggleRow};
use patternfly_yew::prelude::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

const TICK_MS: i32 = 1_000;

/// `setInterval` registration; cleared on drop
struct Ticker {
    handle: i32,
    _callback: Closure<dyn FnMut()>,
}

impl Ticker {
    fn start(on_tick: impl FnMut() + 'static) -> Option<Self> {
        let window = web_sys::window()?;
        let callback = Closure::<dyn FnMut()>::new(on_tick);
        let handle = window
            .set_interval_with_callback_and_timeout_and_arguments_0(callback.as_ref().unchecked_ref(), TICK_MS)
            .ok()?;
        Some(Ticker {
            handle,
            _callback: callback,
        })
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        if let Some(window) = web_sys::window() {
            window.clear_interval_with_handle(self.handle);
        }
    }
}

/// Write a batch; a failure shows up in the popup
fn persist(patch: SettingsPatch, error: UseStateHandle<Option<String>>) {
    spawn_local(async move {
        if let Err(err) = chrome::save(&patch).await {
            log::error!("Popup write failed, change lost: {err}");
            error.set(Some(err.to_string()));
        }
    });
}

#[function_component(App)]
pub fn app() -> Html {
    // listeners outlive renders, so the model sits behind a shared cell
    let model = use_mut_ref(|| None::<PopupState>);
    let error = use_state(|| None::<String>);
    let redraw = use_force_update();

    // Load settings on mount and follow writes from other contexts
    {
        let model = model.clone();
        let error = error.clone();
        let redraw = redraw.clone();
        use_effect_with((), move |_| {
            {
                let model = model.clone();
                let redraw = redraw.clone();
                spawn_local(async move {
                    let snapshot = match chrome::load_snapshot(None).await {
                        Ok(snapshot) => snapshot,
                        Err(err) => {
                            log::warn!("Popup showing defaults: {err}");
                            error.set(Some(err.to_string()));
                            StorageSnapshot::default()
                        }
                    };

                    let (state, heal) = PopupState::load(&snapshot, chrome::now_millis());
                    if let Some(patch) = heal {
                        log::info!("Snooze already expired, re-enabling shorts blocking");
                        persist(patch, error);
                    }
                    *model.borrow_mut() = Some(state);
                    redraw.force_update();
                });
            }

            let subscription = chrome::subscribe(move |changes| {
                if let Some(state) = model.borrow_mut().as_mut() {
                    state.apply_changes(&changes);
                }
                redraw.force_update();
            });
            move || drop(subscription)
        });
    }

    let countdown = model
        .borrow()
        .as_ref()
        .and_then(|state| state.countdown(chrome::now_millis()));

    // One-second refresh, only while a countdown is on screen
    {
        let model = model.clone();
        let redraw = redraw.clone();
        use_effect_with(countdown.is_some(), move |active| {
            let ticker = if *active {
                Ticker::start(move || {
                    if let Some(state) = model.borrow_mut().as_mut() {
                        state.tick(chrome::now_millis());
                    }
                    redraw.force_update();
                })
            } else {
                None
            };
            move || drop(ticker)
        });
    }

    let on_toggle = |key: SettingKey| {
        let model = model.clone();
        let error = error.clone();
        let redraw = redraw.clone();
        Callback::from(move |checked: bool| {
            let patch = model
                .borrow_mut()
                .as_mut()
                .and_then(|state| state.toggle(key, checked));
            if let Some(patch) = patch {
                persist(patch, error.clone());
            }
            redraw.force_update();
        })
    };

    let on_snooze = |choice: SnoozeChoice| {
        let model = model.clone();
        let error = error.clone();
        let redraw = redraw.clone();
        Callback::from(move |_: MouseEvent| {
            let patch = model
                .borrow_mut()
                .as_mut()
                .map(|state| state.choose_snooze(choice, chrome::now_millis()));
            if let Some(patch) = patch {
                log::info!("Shorts blocking snoozed for {}", choice.label());
                persist(patch, error.clone());
            }
            redraw.force_update();
        })
    };

    let on_cancel = {
        let model = model.clone();
        let redraw = redraw.clone();
        Callback::from(move |_: MouseEvent| {
            if let Some(state) = model.borrow_mut().as_mut() {
                state.cancel_snooze();
            }
            redraw.force_update();
        })
    };

    let view = model.borrow().clone();

    html! {
        <div class="padding-20">
            <h1 class="popup-title">{"Social Sentry"}</h1>

            if let Some(message) = (*error).clone() {
                <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                    {message}
                </Alert>
            }

            {match view {
                None => html! {
                    <div class="loading-text-center">
                        <Spinner />
                    </div>
                },
                Some(state) => html! {
                    <>
                        {for SettingKey::ALL.into_iter().map(|key| html! {
                            <ToggleRow
                                key={key.storage_key()}
                                label={key.label()}
                                description={key.description()}
                                checked={state.is_checked(key)}
                                on_toggle={on_toggle(key)}
                            />
                        })}

                        if let Some(remaining) = countdown {
                            <Countdown remaining={remaining} />
                        }

                        if state.snooze_prompt {
                            <div class="snooze-prompt">
                                <p>{"Allow shorts for:"}</p>
                                {for SnoozeChoice::ALL.into_iter().map(|choice| html! {
                                    <Button onclick={on_snooze(choice)} variant={ButtonVariant::Secondary} block={true}>
                                        {choice.label()}
                                    </Button>
                                })}
                                <Button onclick={on_cancel} variant={ButtonVariant::Link} block={true}>
                                    {"Cancel"}
                                </Button>
                            </div>
                        }
                    </>
                },
            }}

            <p class="footer-popup">
                {format!("Social Sentry v{}", env!("CARGO_PKG_VERSION"))}
            </p>
        </div>
    }
}
