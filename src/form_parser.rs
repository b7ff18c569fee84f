use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

/// One `<form>` candidate pulled out of a portal response.
///
/// Only three things matter downstream: where the form posts (`attrs`
/// carries the raw `action`), the hidden state that must be echoed back,
/// and the human-readable submit labels the portal uses to distinguish
/// platforms ("Redeem for Steam", "Redeem for PSN", ...).
#[derive(Debug, Clone, PartialEq)]
pub struct RedeemForm {
    /// Attributes of the form tag itself, e.g. action and method.
    pub attrs: HashMap<String, String>,
    /// Hidden input name -> value, entity-decoded.
    pub hidden: HashMap<String, String>,
    /// Submit labels in document order. Never empty for a retained form.
    pub commit_labels: Vec<String>,
}

impl RedeemForm {
    pub fn action(&self) -> Option<&str> {
        self.attrs.get("action").map(String::as_str)
    }
}

/// Parse an HTML document into redemption form candidates, in document
/// order. Forms without any submit control are dropped; malformed markup
/// is handled by html5ever's recovery and never panics.
pub fn extract_forms(html: &str) -> Vec<RedeemForm> {
    let form_selector = Selector::parse("form").expect("static selector");
    let control_selector = Selector::parse("input, button").expect("static selector");

    let document = Html::parse_document(html);
    let mut forms = Vec::new();

    for form in document.select(&form_selector) {
        let attrs: HashMap<String, String> = form
            .value()
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        let mut hidden = HashMap::new();
        let mut commit_labels = Vec::new();

        for control in form.select(&control_selector) {
            match control.value().name() {
                "input" => collect_input(&control, &mut hidden, &mut commit_labels),
                "button" => collect_button(&control, &mut commit_labels),
                _ => {}
            }
        }

        if commit_labels.is_empty() {
            tracing::debug!(?attrs, "dropping form without a submit control");
            continue;
        }

        forms.push(RedeemForm {
            attrs,
            hidden,
            commit_labels,
        });
    }

    forms
}

fn collect_input(
    input: &ElementRef,
    hidden: &mut HashMap<String, String>,
    commit_labels: &mut Vec<String>,
) {
    let element = input.value();
    let name = element.attr("name");
    let value = element.attr("value");

    let is_hidden = element
        .attr("type")
        .map(|t| t.eq_ignore_ascii_case("hidden"))
        .unwrap_or(false);

    if is_hidden {
        if let Some(name) = name {
            hidden.insert(name.to_string(), value.unwrap_or("").to_string());
        }
    }

    // A named "commit" input doubles as a submit label regardless of type.
    if name == Some("commit") {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            commit_labels.push(value.to_string());
        }
    }
}

fn collect_button(button: &ElementRef, commit_labels: &mut Vec<String>) {
    let element = button.value();
    if element.attr("name") == Some("commit") {
        if let Some(value) = element.attr("value").filter(|v| !v.is_empty()) {
            commit_labels.push(value.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_hidden_fields_and_commit_label() {
        let html = r#"
            <form action="/code_redemptions" method="post">
                <input type="hidden" name="authenticity_token" value="abc123" />
                <input type="hidden" name="archway_code_redemption[check]" value="1" />
                <input type="submit" name="commit" value="Redeem for Steam" />
            </form>
        "#;

        let forms = extract_forms(html);
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].action(), Some("/code_redemptions"));
        assert_eq!(forms[0].hidden["authenticity_token"], "abc123");
        assert_eq!(forms[0].hidden["archway_code_redemption[check]"], "1");
        assert_eq!(forms[0].commit_labels, vec!["Redeem for Steam"]);
    }

    #[test]
    fn test_hidden_values_are_entity_decoded() {
        let html = r#"
            <form>
                <input type="hidden" name="token" value="a&amp;b&quot;c" />
                <input type="submit" name="commit" value="Redeem" />
            </form>
        "#;

        let forms = extract_forms(html);
        assert_eq!(forms[0].hidden["token"], "a&b\"c");
    }

    #[test]
    fn test_form_without_submit_control_is_dropped() {
        let html = r#"
            <form action="/search">
                <input type="hidden" name="q" value="x" />
            </form>
            <form action="/redeem">
                <input type="submit" name="commit" value="Redeem" />
            </form>
        "#;

        let forms = extract_forms(html);
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].action(), Some("/redeem"));
    }

    #[test]
    fn test_document_order_preserved() {
        let html = r#"
            <form id="one"><input name="commit" value="First" /></form>
            <form id="two"><input name="commit" value="Second" /></form>
        "#;

        let forms = extract_forms(html);
        assert_eq!(forms.len(), 2);
        assert_eq!(forms[0].attrs["id"], "one");
        assert_eq!(forms[1].attrs["id"], "two");
    }

    #[test]
    fn test_button_commit_and_label_order() {
        let html = r#"
            <form>
                <button name="commit" value="Redeem for Xbox">Xbox</button>
                <button name="commit" value="Redeem for PSN">PSN</button>
            </form>
        "#;

        let forms = extract_forms(html);
        assert_eq!(
            forms[0].commit_labels,
            vec!["Redeem for Xbox", "Redeem for PSN"]
        );
    }

    #[test]
    fn test_commit_input_with_empty_value_ignored() {
        let html = r#"
            <form>
                <input name="commit" value="" />
                <input name="commit" value="Redeem" />
            </form>
        "#;

        let forms = extract_forms(html);
        assert_eq!(forms[0].commit_labels, vec!["Redeem"]);
    }

    #[test]
    fn test_malformed_markup_does_not_panic() {
        let html = "<form><input name=commit value=Redeem<form></div>";
        let _ = extract_forms(html);
    }
}
