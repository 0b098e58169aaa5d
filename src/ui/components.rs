//! Reusable UI components

use web_sys::HtmlInputElement;
use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct ToggleRowProps {
    pub label: AttrValue,
    #[prop_or_default]
    pub description: Option<AttrValue>,
    pub checked: bool,
    /// Receives the value the user asked for
    pub on_toggle: Callback<bool>,
}

/// A labelled checkbox whose state is owned by the caller.
///
/// The input is put back to `checked` right after a click; it only moves
/// once the caller re-renders with a new value.
#[function_component(ToggleRow)]
pub fn toggle_row(props: &ToggleRowProps) -> Html {
    let onchange = {
        let on_toggle = props.on_toggle.clone();
        let checked = props.checked;
        Callback::from(move |e: Event| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                let requested = input.checked();
                input.set_checked(checked);
                on_toggle.emit(requested);
            }
        })
    };

    html! {
        <label class="toggle-row">
            <div>
                <div class="toggle-label">{props.label.clone()}</div>
                if let Some(description) = &props.description {
                    <div class="toggle-description">{description.clone()}</div>
                }
            </div>
            <input type="checkbox" checked={props.checked} {onchange} />
        </label>
    }
}

#[derive(Properties, PartialEq)]
pub struct CountdownProps {
    /// Already formatted `m:ss`
    pub remaining: AttrValue,
}

#[function_component(Countdown)]
pub fn countdown(props: &CountdownProps) -> Html {
    html! {
        <p class="countdown">{format!("Shorts blocking resumes in {}", props.remaining)}</p>
    }
}
