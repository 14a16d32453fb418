//! Companion Telegram bot: collects phone, name and location, registers the
//! user with the backend and hands back a Mini-App link.

pub mod runner;
pub mod telegram;

use crate::dto::auth::{BotRegisterRequest, LocationPayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    NeedContact,
    NeedName,
    NeedLocation,
    Ready,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub telegram_id: i64,
    pub stage: Stage,
    pub phone: String,
    pub contact_first_name: String,
    pub contact_last_name: String,
    pub name: String,
}

impl Session {
    pub fn new(telegram_id: i64) -> Self {
        Self {
            telegram_id,
            stage: Stage::NeedContact,
            phone: String::new(),
            contact_first_name: String::new(),
            contact_last_name: String::new(),
            name: String::new(),
        }
    }
}

/// A user message reduced to what the onboarding flow cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Start,
    Contact {
        phone: String,
        first_name: String,
        last_name: String,
    },
    Text(String),
    Location {
        latitude: f64,
        longitude: f64,
    },
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    AskContact,
    InvalidPhone,
    AskName,
    AskLocation,
    AskStart,
    Register(BotRegisterRequest),
}

/// Advances the onboarding flow for one message. Returns the session to keep
/// (`None` clears it) and what to answer.
pub fn step(telegram_id: i64, session: Option<Session>, msg: Incoming) -> (Option<Session>, Reply) {
    match (session, msg) {
        (_, Incoming::Start) => (Some(Session::new(telegram_id)), Reply::AskContact),

        (session, Incoming::Contact {
            phone,
            first_name,
            last_name,
        }) => {
            let mut session = session.unwrap_or_else(|| Session::new(telegram_id));
            let phone = normalize_phone(&phone);
            if phone.is_empty() {
                session.stage = Stage::NeedContact;
                return (Some(session), Reply::AskContact);
            }
            session.phone = phone;
            session.contact_first_name = first_name.trim().to_string();
            session.contact_last_name = last_name.trim().to_string();
            session.stage = Stage::NeedName;
            (Some(session), Reply::AskName)
        }

        (Some(mut session), Incoming::Text(text)) if session.stage == Stage::NeedContact => {
            let phone = normalize_phone(&text);
            if phone.is_empty() {
                return (Some(session), Reply::InvalidPhone);
            }
            session.phone = phone;
            session.stage = Stage::NeedName;
            (Some(session), Reply::AskName)
        }

        (Some(mut session), Incoming::Text(text)) if session.stage == Stage::NeedName => {
            let name = text.trim();
            if name.is_empty() {
                return (Some(session), Reply::AskName);
            }
            session.name = name.to_string();
            session.stage = Stage::NeedLocation;
            (Some(session), Reply::AskLocation)
        }

        (session, Incoming::Text(_)) => (session, Reply::AskStart),

        (Some(mut session), Incoming::Location {
            latitude,
            longitude,
        }) if session.stage == Stage::NeedLocation => {
            session.stage = Stage::Ready;
            let request = BotRegisterRequest {
                telegram_id: session.telegram_id,
                phone: session.phone.clone(),
                first_name: session.name.clone(),
                last_name: session.contact_last_name.clone(),
                name: session.contact_first_name.clone(),
                location: Some(LocationPayload {
                    latitude,
                    longitude,
                }),
            };
            (Some(session), Reply::Register(request))
        }

        (session, Incoming::Location { .. }) => (session, Reply::AskStart),

        (_, Incoming::Other) => (None, Reply::AskStart),
    }
}

/// Keeps an optional leading `+` and the digits; everything else is dropped.
pub fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return String::new();
    }
    if trimmed.starts_with('+') {
        format!("+{digits}")
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const TG: i64 = 42;

    #[rstest]
    #[case("+998 (90) 123-45-67", "+998901234567")]
    #[case("90 123 45 67", "901234567")]
    #[case("  +1-800  ", "+1800")]
    #[case("call me", "")]
    #[case("+", "")]
    fn phone_normalization(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_phone(raw), expected);
    }

    #[test]
    fn full_flow_with_shared_contact() {
        let (s, reply) = step(TG, None, Incoming::Start);
        assert_eq!(reply, Reply::AskContact);

        let (s, reply) = step(
            TG,
            s,
            Incoming::Contact {
                phone: "998901234567".into(),
                first_name: "Ali".into(),
                last_name: "Valiyev".into(),
            },
        );
        assert_eq!(reply, Reply::AskName);
        assert_eq!(s.as_ref().map(|s| s.stage), Some(Stage::NeedName));

        let (s, reply) = step(TG, s, Incoming::Text("  Ali V  ".into()));
        assert_eq!(reply, Reply::AskLocation);

        let (s, reply) = step(
            TG,
            s,
            Incoming::Location {
                latitude: 41.3,
                longitude: 69.2,
            },
        );
        let Reply::Register(request) = reply else {
            panic!("expected registration, got {reply:?}");
        };
        assert_eq!(request.telegram_id, TG);
        assert_eq!(request.phone, "998901234567");
        assert_eq!(request.first_name, "Ali V");
        assert_eq!(request.last_name, "Valiyev");
        assert_eq!(s.map(|s| s.stage), Some(Stage::Ready));
    }

    #[test]
    fn typed_phone_is_accepted_in_need_contact() {
        let (s, _) = step(TG, None, Incoming::Start);
        let (s, reply) = step(TG, s, Incoming::Text("hello".into()));
        assert_eq!(reply, Reply::InvalidPhone);
        let (s, reply) = step(TG, s, Incoming::Text("+998 90 000 00 00".into()));
        assert_eq!(reply, Reply::AskName);
        assert_eq!(s.map(|s| s.phone), Some("+998900000000".to_string()));
    }

    #[test]
    fn location_outside_need_location_is_ignored() {
        let (s, _) = step(TG, None, Incoming::Start);
        let (s, reply) = step(
            TG,
            s,
            Incoming::Location {
                latitude: 0.0,
                longitude: 0.0,
            },
        );
        assert_eq!(reply, Reply::AskStart);
        assert_eq!(s.map(|s| s.stage), Some(Stage::NeedContact));
    }

    #[test]
    fn text_without_session_asks_for_start() {
        let (s, reply) = step(TG, None, Incoming::Text("hi".into()));
        assert_eq!(reply, Reply::AskStart);
        assert!(s.is_none());
    }

    #[test]
    fn unrecognized_message_resets_session() {
        let (s, _) = step(TG, None, Incoming::Start);
        let (s, reply) = step(TG, s, Incoming::Other);
        assert_eq!(reply, Reply::AskStart);
        assert!(s.is_none());
    }
}
