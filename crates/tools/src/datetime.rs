//! Date/time tool. Tells the model what day and time it is.

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use toolweave_core::error::ToolError;
use toolweave_core::message::{ToolInput, ToolOutput};
use toolweave_core::tool::Tool;

pub struct DateTimeTool;

/// Render the sentence the tool answers with.
pub fn describe<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("Today's date is %A, %B %d, %Y and it is %I:%M %p %Z")
        .to_string()
}

#[async_trait]
impl Tool for DateTimeTool {
    fn name(&self) -> &str {
        "datetime"
    }

    fn description(&self) -> &str {
        "Provides the current date and time."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "timezone": {
                    "type": "string",
                    "enum": ["local", "utc"],
                    "description": "Which clock to read",
                    "default": "local"
                }
            }
        })
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput, ToolError> {
        let sentence = match input.argument("timezone").map(str::trim) {
            None | Some("") | Some("local") => describe(&Local::now()),
            Some(zone) if zone.eq_ignore_ascii_case("utc") => describe(&Utc::now()),
            Some(other) => {
                return Err(ToolError::InvalidArguments(format!(
                    "Unknown timezone '{other}', expected 'local' or 'utc'"
                )));
            }
        };
        Ok(ToolOutput::text(self.name(), sentence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolweave_core::message::OutputContent;

    #[test]
    fn sentence_format() {
        let now = Utc.with_ymd_and_hms(2025, 3, 7, 14, 5, 0).unwrap();
        assert_eq!(
            describe(&now),
            "Today's date is Friday, March 07, 2025 and it is 02:05 PM UTC"
        );
    }

    #[tokio::test]
    async fn answers_with_text() {
        let output = DateTimeTool.execute(&ToolInput::new("datetime")).await.unwrap();
        assert_eq!(output.name, "datetime");
        match &output.content[..] {
            [OutputContent::Text { text }] => assert!(text.starts_with("Today's date is ")),
            other => panic!("Unexpected content: {other:?}"),
        }
    }

    #[tokio::test]
    async fn utc_is_selectable() {
        let input = ToolInput::new("datetime").with_argument("timezone", "UTC");
        let output = DateTimeTool.execute(&input).await.unwrap();
        assert_eq!(output.content.len(), 1);
    }

    #[tokio::test]
    async fn unknown_timezone_is_rejected() {
        let input = ToolInput::new("datetime").with_argument("timezone", "mars");
        let err = DateTimeTool.execute(&input).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
