use crate::form_parser::RedeemForm;
use url::Url;

/// Canonical platform names and the spellings players and the portal use
/// for them. Comparison happens on normalized tokens (lowercase, letters
/// and digits only), so "PS5", "ps-5" and "ps5" all land on playstation.
const PLATFORM_ALIASES: &[(&str, &[&str])] = &[
    (
        "playstation",
        &["ps", "psn", "ps3", "ps4", "ps5", "playstationnetwork", "sony"],
    ),
    (
        "xbox",
        &["xbox", "xboxone", "xboxseriesx", "xbl", "xboxlive", "microsoft"],
    ),
    ("steam", &["steam"]),
    ("epic", &["epic", "egs", "epicgames"]),
    ("nintendo", &["nintendo", "switch", "nintendoswitch"]),
    ("stadia", &["stadia"]),
];

/// Field names the portal reads the code from. The code is only inserted
/// where the form's own hidden state did not already provide a value.
const CODE_FIELDS: &[&str] = &["archway_code_redemption[code]", "code"];

/// A fully prepared form submission: where to post, what to post, and
/// which submit label was chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct FormSubmission {
    pub action: Url,
    pub payload: Vec<(String, String)>,
    pub commit: String,
}

/// Lowercase and strip everything that is not a letter or digit.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Expand a normalized preference into every token that should count as a
/// match. Unrecognized preferences match only themselves.
fn expand_aliases(preference: &str) -> Vec<String> {
    for (canonical, aliases) in PLATFORM_ALIASES {
        if *canonical == preference || aliases.contains(&preference) {
            let mut tokens = vec![canonical.to_string()];
            tokens.extend(aliases.iter().map(|a| a.to_string()));
            return tokens;
        }
    }
    vec![preference.to_string()]
}

/// Choose the form (and submit label) to post for `code`.
///
/// With no preference, or when nothing matches it, this is the first form
/// and its first label. A configured-but-unmatched preference degrades to
/// that default with a warning; it never fails the attempt. Returns `None`
/// only when `forms` is empty.
pub fn select_form(
    forms: &[RedeemForm],
    code: &str,
    preference: &str,
    base: &Url,
    fallback_action: &Url,
) -> Option<FormSubmission> {
    let first = forms.first()?;

    let (form, label) = match match_preference(forms, preference) {
        Some(choice) => choice,
        None => {
            if !preference.trim().is_empty() {
                tracing::warn!(
                    preference,
                    forms = forms.len(),
                    "no form matched the platform preference, using the first form"
                );
            }
            (first, first.commit_labels[0].as_str())
        }
    };

    Some(build_submission(form, label, code, base, fallback_action))
}

/// First form whose searchable text contains any alias of the preference,
/// together with the best submit label inside it.
fn match_preference<'a>(
    forms: &'a [RedeemForm],
    preference: &str,
) -> Option<(&'a RedeemForm, &'a str)> {
    let preference = normalize(preference);
    if preference.is_empty() {
        return None;
    }
    let aliases = expand_aliases(&preference);

    for form in forms {
        let haystack = form_haystack(form);
        if !aliases.iter().any(|alias| haystack.contains(alias)) {
            continue;
        }

        // Prefer the label that itself names the platform; otherwise the
        // match may have come from hidden state, so take the first label.
        let label = form
            .commit_labels
            .iter()
            .find(|label| {
                let label = normalize(label);
                aliases.iter().any(|alias| label.contains(alias))
            })
            .map(String::as_str)
            .unwrap_or(form.commit_labels[0].as_str());

        return Some((form, label));
    }

    None
}

fn form_haystack(form: &RedeemForm) -> String {
    let mut haystack = String::new();
    for label in &form.commit_labels {
        haystack.push_str(&normalize(label));
    }
    for value in form.hidden.values() {
        haystack.push_str(&normalize(value));
    }
    for value in form.attrs.values() {
        haystack.push_str(&normalize(value));
    }
    haystack
}

fn build_submission(
    form: &RedeemForm,
    label: &str,
    code: &str,
    base: &Url,
    fallback_action: &Url,
) -> FormSubmission {
    // A hidden field named "commit" would collide with the chosen label;
    // the label is the single commit value the portal sees.
    let mut payload: Vec<(String, String)> = form
        .hidden
        .iter()
        .filter(|(name, _)| name.as_str() != "commit")
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    for field in CODE_FIELDS {
        if !form.hidden.contains_key(*field) {
            payload.push((field.to_string(), code.to_string()));
        }
    }
    payload.push(("commit".to_string(), label.to_string()));

    let action = match form.action() {
        Some(raw) => base.join(raw).unwrap_or_else(|e| {
            tracing::warn!(action = raw, error = %e, "unresolvable form action, using configured endpoint");
            fallback_action.clone()
        }),
        None => fallback_action.clone(),
    };

    FormSubmission {
        action,
        payload,
        commit: label.to_string(),
    }
}
