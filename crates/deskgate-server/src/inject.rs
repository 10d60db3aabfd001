//! Runtime configuration injection into the entry document.
//!
//! The SPA bundle is built once and deployed anywhere; the URLs it talks to
//! are decided at gateway startup and written into the entry document as
//! globals the bundle reads before making its first request.

use crate::error::ServerError;

/// Backend endpoint URLs injected into the entry document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Base URL the SPA uses for API calls.
    pub api_url: String,
    /// Base URL the SPA uses for its WebSocket connection.
    pub ws_url: String,
}

/// Insert a script block defining `window.apiUrl` and `window.wsUrl`
/// immediately after the document's head-open tag.
///
/// The tag is the first `<head`, with or without attributes. Placing the
/// block there puts it ahead of any bundle scripts in the head, so the
/// globals exist before application code runs. Each call produces exactly
/// one injected block.
///
/// # Errors
///
/// Returns [`ServerError::HeadMarkerMissing`] when the template has no
/// head-open tag. Injection never silently no-ops.
pub fn inject_runtime_config(
    template: &str,
    runtime: &RuntimeConfig,
) -> Result<String, ServerError> {
    let insert_at = head_open_end(template).ok_or(ServerError::HeadMarkerMissing)?;
    let script = runtime_config_script(runtime);

    let mut document = String::with_capacity(template.len() + script.len());
    document.push_str(&template[..insert_at]);
    document.push_str(&script);
    document.push_str(&template[insert_at..]);
    Ok(document)
}

/// Script block defining the runtime globals.
fn runtime_config_script(runtime: &RuntimeConfig) -> String {
    format!(
        "<script>window.apiUrl = {};window.wsUrl = {};</script>",
        script_literal(&runtime.api_url),
        script_literal(&runtime.ws_url),
    )
}

/// Encode a value as a JavaScript string literal.
///
/// JSON string encoding covers quotes and control characters; `</` is
/// additionally escaped because it would end the script element early
/// inside an HTML document.
fn script_literal(value: &str) -> String {
    serde_json::Value::String(value.to_owned())
        .to_string()
        .replace("</", "<\\/")
}

/// Byte offset just past the closing `>` of the first head-open tag.
///
/// `<head>` and `<head lang="en">` both match; `<header>` does not.
fn head_open_end(html: &str) -> Option<usize> {
    let mut search_from = 0;
    while let Some(found) = html[search_from..].find("<head") {
        let after = search_from + found + "<head".len();
        match html[after..].chars().next() {
            Some('>') => return Some(after + 1),
            Some(c) if c.is_ascii_whitespace() => {
                return html[after..].find('>').map(|close| after + close + 1);
            }
            _ => search_from = after,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn runtime() -> RuntimeConfig {
        RuntimeConfig {
            api_url: "http://10.0.0.5:3000/api".to_owned(),
            ws_url: "ws://10.0.0.5:3000/ws".to_owned(),
        }
    }

    #[test]
    fn injects_directly_after_plain_head_tag() {
        let template = "<html><head></head><body>App</body></html>";
        let document = inject_runtime_config(template, &runtime()).unwrap();

        assert_eq!(
            document,
            "<html><head><script>window.apiUrl = \"http://10.0.0.5:3000/api\";\
             window.wsUrl = \"ws://10.0.0.5:3000/ws\";</script></head><body>App</body></html>"
        );
    }

    #[test]
    fn injects_after_attributed_head_tag() {
        let template = "<html><head lang=\"en\"\n  data-x=\"1\"><title>T</title></head></html>";
        let document = inject_runtime_config(template, &runtime()).unwrap();

        assert!(document.contains("<head lang=\"en\"\n  data-x=\"1\"><script>window.apiUrl"));
        let config_at = document.find("window.apiUrl").unwrap();
        let title_at = document.find("<title>").unwrap();
        assert!(config_at < title_at);
    }

    #[test]
    fn injected_block_precedes_bundle_scripts() {
        let template =
            "<html><head><script src=\"/assets/index-abc123.js\"></script></head></html>";
        let document = inject_runtime_config(template, &runtime()).unwrap();

        let config_at = document.find("window.apiUrl").unwrap();
        let bundle_at = document.find("/assets/index-abc123.js").unwrap();
        assert!(config_at < bundle_at);
    }

    #[test]
    fn produces_exactly_one_block() {
        let template = "<html><head></head><body><head></head></body></html>";
        let document = inject_runtime_config(template, &runtime()).unwrap();

        assert_eq!(document.matches("window.apiUrl").count(), 1);
    }

    #[test]
    fn missing_head_tag_is_an_error() {
        let err = inject_runtime_config("<html><body>App</body></html>", &runtime());
        assert!(matches!(err, Err(ServerError::HeadMarkerMissing)));
    }

    #[test]
    fn header_tag_is_not_a_head_tag() {
        let err = inject_runtime_config("<html><header>nav</header></html>", &runtime());
        assert!(matches!(err, Err(ServerError::HeadMarkerMissing)));
    }

    #[test]
    fn distinct_configs_produce_distinct_documents() {
        let template = "<html><head></head></html>";
        let first = inject_runtime_config(template, &runtime()).unwrap();

        let mut other = runtime();
        other.api_url = "http://192.168.1.20:3000/api".to_owned();
        let second = inject_runtime_config(template, &other).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn url_values_cannot_break_out_of_the_script_block() {
        let mut hostile = runtime();
        hostile.api_url = "http://x/\"</script><script>alert(1)".to_owned();
        let document =
            inject_runtime_config("<html><head></head></html>", &hostile).unwrap();

        assert_eq!(document.matches("</script>").count(), 1);
    }
}
