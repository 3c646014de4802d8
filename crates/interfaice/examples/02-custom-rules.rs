//! Runs offline against the mock client and prints the prompts it receives.

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use interfaice::{
    CustomRule, DecodeError, InvokeError, MockChatClient, ProxyFactory, ai_interface,
    init_tracing,
};

#[ai_interface]
trait Calendar {
    fn next_holiday(&self, after: NaiveDate, country: &str) -> Result<NaiveDate, InvokeError>;

    #[ai_chat(model = "gpt-4o-mini")]
    fn is_weekend(&self, day: NaiveDate) -> Result<bool, InvokeError>;
}

/// Dates as `dd.MM.yyyy` instead of the ISO format.
fn dotted_dates() -> CustomRule {
    CustomRule::typed::<NaiveDate, _, _>(
        "a date literal with format: dd.MM.yyyy",
        |date| date.format("%d.%m.%Y").to_string(),
        |text| {
            NaiveDate::parse_from_str(text.trim(), "%d.%m.%Y").map_err(|err| {
                DecodeError::InvalidLiteral {
                    expected: "dd.MM.yyyy date",
                    raw: text.to_string(),
                    reason: err.to_string(),
                }
            })
        },
    )
}

fn main() -> Result<()> {
    init_tracing()?;

    let client = Arc::new(MockChatClient::with_answers(["01.03.2025", "true"]));
    let mut factory = ProxyFactory::builder().client(client.clone()).build();
    factory.add_custom_rules([dotted_dates()]);
    let calendar: CalendarProxy = factory.create();

    let after = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap_or_default();
    println!("next holiday: {}", calendar.next_holiday(after, "Korea")?);
    println!("weekend: {}", calendar.is_weekend(after)?);

    for request in client.requests() {
        println!("--- {} ---", request.model);
        for message in &request.messages {
            println!("[{}]\n{}\n", message.role.as_str(), message.content);
        }
    }
    Ok(())
}
