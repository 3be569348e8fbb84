//! Fixed presentation rules for inbound events.
//!
//! Every rule is data-driven from the event itself; nothing here touches the
//! network or the clock. Bodies prefer a server-supplied message and fall
//! back to a composed Turkish default, matching the production catalog.

use zylo_channel::ChannelEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates notification priority tiers.
pub enum Priority {
    Urgent,
    High,
    Medium,
    Low,
    Default,
}

impl Priority {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "urgent" => Self::Urgent,
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates notification category tags (the Android channel set).
pub enum Category {
    Chat,
    Medical,
    Administrative,
    System,
    Urgent,
    Reminder,
    Default,
}

impl Category {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "chat" => Self::Chat,
            "medical" => Self::Medical,
            "administrative" => Self::Administrative,
            "system" => Self::System,
            "urgent" => Self::Urgent,
            "reminder" => Self::Reminder,
            _ => Self::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Medical => "medical",
            Self::Administrative => "administrative",
            Self::System => "system",
            Self::Urgent => "urgent",
            Self::Reminder => "reminder",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Sound and vibration class derived from the priority tier.
pub enum AlertClass {
    /// Alert sound plus strong vibration.
    Alert,
    /// No sound, short vibration only.
    Silent,
    /// Platform default sound, no explicit vibration pattern.
    Standard,
}

impl AlertClass {
    pub fn for_priority(priority: Priority) -> Self {
        match priority {
            Priority::Urgent | Priority::High => Self::Alert,
            Priority::Low => Self::Silent,
            Priority::Medium | Priority::Default => Self::Standard,
        }
    }

    pub fn plays_sound(&self) -> bool {
        !matches!(self, Self::Silent)
    }

    pub fn vibration_pattern(&self) -> &'static [u64] {
        match self {
            Self::Alert => &[0, 250, 250, 250],
            Self::Silent => &[0, 100],
            Self::Standard => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A notification ready for the host surface to display.
pub struct LocalNotification {
    pub title: String,
    pub body: String,
    pub priority: Priority,
    pub category: Category,
    pub alert: AlertClass,
}

impl LocalNotification {
    fn new(title: String, body: String, priority: Priority, category: Category) -> Self {
        Self {
            title,
            body,
            priority,
            category,
            alert: AlertClass::for_priority(priority),
        }
    }
}

const GENERIC_TITLE: &str = "🔔 Yeni Bildirim";
const GENERIC_BODY: &str = "Yeni bir bildiriminiz var";

/// Looks up the presentation rule for `event`.
///
/// Returns `None` for events that carry no user-visible notification
/// (lifecycle frames and the badge count). Unrecognized event types get the
/// generic rule rather than being dropped.
pub fn presentation(event: &ChannelEvent) -> Option<LocalNotification> {
    let notification = match event {
        ChannelEvent::ChatNewMessage {
            sender_name,
            content,
            ..
        } => LocalNotification::new(
            format!("{sender_name} tarafından yeni mesaj"),
            content.clone(),
            Priority::Default,
            Category::Chat,
        ),
        ChannelEvent::ChatGroupUpdated { group_name } => LocalNotification::new(
            "Grup Güncellemesi".to_string(),
            format!("\"{group_name}\" grubu güncellendi"),
            Priority::Default,
            Category::Default,
        ),
        ChannelEvent::ChatGroupMemberAdded { group_name } => LocalNotification::new(
            "Gruba Eklendiniz".to_string(),
            format!("\"{group_name}\" grubuna eklendiniz"),
            Priority::Default,
            Category::Default,
        ),
        ChannelEvent::ChatGroupMemberRemoved { group_name } => LocalNotification::new(
            "Gruptan Çıkarıldınız".to_string(),
            format!("\"{group_name}\" grubundan çıkarıldınız"),
            Priority::Default,
            Category::Default,
        ),
        ChannelEvent::NotificationNew { title, content } => LocalNotification::new(
            if title.is_empty() {
                GENERIC_TITLE.to_string()
            } else {
                title.clone()
            },
            content.clone(),
            Priority::Default,
            Category::Default,
        ),
        ChannelEvent::Enhanced {
            title,
            body,
            priority,
            category,
        } => {
            let priority = priority
                .as_deref()
                .map(Priority::parse)
                .unwrap_or(Priority::Default);
            let category = category
                .as_deref()
                .map(Category::parse)
                .unwrap_or(Category::Default);
            LocalNotification::new(title.clone(), body.clone(), priority, category)
        }
        ChannelEvent::DoctorAssignment {
            patient_name,
            pet_name,
            message,
        } => LocalNotification::new(
            "👨‍⚕️ Hekim Ataması".to_string(),
            message.clone().unwrap_or_else(|| {
                format!("{patient_name} - {pet_name} için hekim olarak atandınız")
            }),
            Priority::High,
            Category::Medical,
        ),
        ChannelEvent::ExaminationCreated {
            patient_name,
            pet_name,
            message,
        } => LocalNotification::new(
            "🩺 Yeni Muayene".to_string(),
            message.clone().unwrap_or_else(|| {
                format!("{patient_name} - {pet_name} için yeni muayene oluşturuldu")
            }),
            Priority::Medium,
            Category::Medical,
        ),
        ChannelEvent::AppointmentCreated {
            patient_name,
            pet_name,
            message,
        } => LocalNotification::new(
            "📅 Yeni Randevu".to_string(),
            message.clone().unwrap_or_else(|| {
                format!("{patient_name} - {pet_name} için yeni randevu oluşturuldu")
            }),
            Priority::Medium,
            Category::Administrative,
        ),
        ChannelEvent::ProductLowStock {
            product_name,
            message,
        } => LocalNotification::new(
            "⚠️ Stok Uyarısı".to_string(),
            message
                .clone()
                .unwrap_or_else(|| format!("{product_name} ürününde stok azalması")),
            Priority::High,
            Category::Administrative,
        ),
        ChannelEvent::PrescriptionCreated {
            patient_name,
            pet_name,
            message,
        } => LocalNotification::new(
            "💊 Yeni Reçete".to_string(),
            message.clone().unwrap_or_else(|| {
                format!("{patient_name} - {pet_name} için yeni reçete oluşturuldu")
            }),
            Priority::Medium,
            Category::Medical,
        ),
        ChannelEvent::DailyReport { message } => LocalNotification::new(
            "📊 Günlük Rapor".to_string(),
            message
                .clone()
                .unwrap_or_else(|| "Günlük aktivite raporu hazır".to_string()),
            Priority::Low,
            Category::System,
        ),
        ChannelEvent::PendingPrescriptions { count, message } => LocalNotification::new(
            "⏰ Bekleyen Reçeteler".to_string(),
            message
                .clone()
                .unwrap_or_else(|| format!("{} bekleyen reçete bulunuyor", count_word(*count))),
            Priority::Medium,
            Category::Reminder,
        ),
        ChannelEvent::IncompleteExaminations { count, message } => LocalNotification::new(
            "📋 Tamamlanmamış Muayeneler".to_string(),
            message.clone().unwrap_or_else(|| {
                format!("{} tamamlanmamış muayene bulunuyor", count_word(*count))
            }),
            Priority::Medium,
            Category::Reminder,
        ),
        ChannelEvent::SystemNotice { message, priority } => {
            let priority = priority
                .as_deref()
                .map(Priority::parse)
                .unwrap_or(Priority::Low);
            let category = if priority == Priority::Urgent {
                Category::Urgent
            } else {
                Category::System
            };
            LocalNotification::new(
                "⚙️ Sistem Bildirimi".to_string(),
                message
                    .clone()
                    .unwrap_or_else(|| "Sistem bildirimi".to_string()),
                priority,
                category,
            )
        }
        ChannelEvent::Unknown { data, .. } => LocalNotification::new(
            lookup_text(data, &["title"]).unwrap_or_else(|| GENERIC_TITLE.to_string()),
            lookup_text(data, &["message", "content", "body"])
                .unwrap_or_else(|| GENERIC_BODY.to_string()),
            Priority::Default,
            Category::Default,
        ),
        ChannelEvent::ChatMessagesRead
        | ChannelEvent::NotificationCount { .. }
        | ChannelEvent::ServerReady
        | ChannelEvent::Pong
        | ChannelEvent::AuthError { .. }
        | ChannelEvent::ServerDisconnect => return None,
    };
    Some(notification)
}

fn count_word(count: Option<u64>) -> String {
    match count {
        Some(count) => count.to_string(),
        None => "Birkaç".to_string(),
    }
}

fn lookup_text(data: &serde_json::Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| data.get(key).and_then(|value| value.as_str()))
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use zylo_channel::ChannelEvent;

    use super::{presentation, AlertClass, Category, Priority};

    #[test]
    fn spec_doctor_assignment_presents_high_medical_alert() {
        let event = ChannelEvent::DoctorAssignment {
            patient_name: "Rex".to_string(),
            pet_name: "Buddy".to_string(),
            message: None,
        };
        let rule = presentation(&event).expect("presentable");
        assert!(rule.title.contains("Hekim Ataması"));
        assert_eq!(rule.body, "Rex - Buddy için hekim olarak atandınız");
        assert_eq!(rule.priority, Priority::High);
        assert_eq!(rule.category, Category::Medical);
        assert_eq!(rule.alert, AlertClass::Alert);
    }

    #[test]
    fn spec_unknown_event_falls_back_to_generic_rule() {
        let event = ChannelEvent::Unknown {
            name: "notification:never_seen".to_string(),
            data: json!({}),
        };
        let rule = presentation(&event).expect("presentable");
        assert_eq!(rule.title, "🔔 Yeni Bildirim");
        assert_eq!(rule.body, "Yeni bir bildiriminiz var");
        assert_eq!(rule.category, Category::Default);
    }

    #[test]
    fn unit_unknown_event_prefers_payload_text() {
        let event = ChannelEvent::Unknown {
            name: "notification:campaign".to_string(),
            data: json!({ "title": "Kampanya", "message": "Yeni kampanya başladı" }),
        };
        let rule = presentation(&event).expect("presentable");
        assert_eq!(rule.title, "Kampanya");
        assert_eq!(rule.body, "Yeni kampanya başladı");
    }

    #[test]
    fn unit_priority_maps_to_alert_classes() {
        assert_eq!(AlertClass::for_priority(Priority::Urgent), AlertClass::Alert);
        assert_eq!(AlertClass::for_priority(Priority::High), AlertClass::Alert);
        assert_eq!(AlertClass::for_priority(Priority::Low), AlertClass::Silent);
        assert_eq!(
            AlertClass::for_priority(Priority::Medium),
            AlertClass::Standard
        );

        assert_eq!(AlertClass::Alert.vibration_pattern(), &[0, 250, 250, 250]);
        assert_eq!(AlertClass::Silent.vibration_pattern(), &[0, 100]);
        assert!(!AlertClass::Silent.plays_sound());
        assert!(AlertClass::Standard.plays_sound());
    }

    #[test]
    fn unit_daily_report_is_silent() {
        let rule = presentation(&ChannelEvent::DailyReport { message: None }).expect("presentable");
        assert_eq!(rule.priority, Priority::Low);
        assert_eq!(rule.alert, AlertClass::Silent);
        assert_eq!(rule.body, "Günlük aktivite raporu hazır");
    }

    #[test]
    fn unit_lifecycle_events_have_no_presentation() {
        assert!(presentation(&ChannelEvent::ServerReady).is_none());
        assert!(presentation(&ChannelEvent::Pong).is_none());
        assert!(presentation(&ChannelEvent::NotificationCount { count: 4 }).is_none());
        assert!(presentation(&ChannelEvent::ServerDisconnect).is_none());
        assert!(presentation(&ChannelEvent::ChatMessagesRead).is_none());
    }

    #[test]
    fn unit_pending_prescriptions_without_count_uses_vague_wording() {
        let rule = presentation(&ChannelEvent::PendingPrescriptions {
            count: None,
            message: None,
        })
        .expect("presentable");
        assert_eq!(rule.body, "Birkaç bekleyen reçete bulunuyor");
        assert_eq!(rule.category, Category::Reminder);
    }

    #[test]
    fn unit_urgent_system_notice_lands_in_urgent_category() {
        let rule = presentation(&ChannelEvent::SystemNotice {
            message: Some("Bakım başlıyor".to_string()),
            priority: Some("urgent".to_string()),
        })
        .expect("presentable");
        assert_eq!(rule.category, Category::Urgent);
        assert_eq!(rule.alert, AlertClass::Alert);
    }
}
