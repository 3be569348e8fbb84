//! Wire frames and the inbound event catalog.
//!
//! Frames are JSON text messages of the shape `{"event": name, "data": {...}}`.
//! Inbound payloads come from a server that is loose with field placement, so
//! extraction is lenient: each variant pulls its fields through fallback
//! chains and fills Turkish default copy the way the product always has.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A single JSON frame exchanged over the event channel.
pub struct WireFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl WireFrame {
    pub fn new(event: &str, data: Value) -> Self {
        Self {
            event: event.to_string(),
            data,
        }
    }

    /// Handshake announcing client readiness, sent right after connect.
    pub fn client_ready() -> Self {
        Self::new("client_ready", json!({ "platform": "mobile" }))
    }

    /// Request for the authoritative unread-notification count.
    pub fn get_count() -> Self {
        Self::new("notification:get_count", json!({}))
    }

    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

/// Parses a raw text frame; malformed frames yield `None` and are skipped.
pub fn parse_channel_frame(raw: &str) -> Option<WireFrame> {
    serde_json::from_str::<WireFrame>(raw).ok()
}

#[derive(Debug, Clone, PartialEq)]
/// Discriminated union over the server's real-time event catalog.
pub enum ChannelEvent {
    ChatNewMessage {
        sender_name: String,
        content: String,
        conversation_id: Option<String>,
    },
    ChatGroupUpdated {
        group_name: String,
    },
    ChatGroupMemberAdded {
        group_name: String,
    },
    ChatGroupMemberRemoved {
        group_name: String,
    },
    /// Read receipts update in-content state only; nothing to surface.
    ChatMessagesRead,
    NotificationNew {
        title: String,
        content: String,
    },
    Enhanced {
        title: String,
        body: String,
        priority: Option<String>,
        category: Option<String>,
    },
    DoctorAssignment {
        patient_name: String,
        pet_name: String,
        message: Option<String>,
    },
    ExaminationCreated {
        patient_name: String,
        pet_name: String,
        message: Option<String>,
    },
    AppointmentCreated {
        patient_name: String,
        pet_name: String,
        message: Option<String>,
    },
    ProductLowStock {
        product_name: String,
        message: Option<String>,
    },
    PrescriptionCreated {
        patient_name: String,
        pet_name: String,
        message: Option<String>,
    },
    DailyReport {
        message: Option<String>,
    },
    PendingPrescriptions {
        count: Option<u64>,
        message: Option<String>,
    },
    IncompleteExaminations {
        count: Option<u64>,
        message: Option<String>,
    },
    SystemNotice {
        message: Option<String>,
        priority: Option<String>,
    },
    NotificationCount {
        count: u64,
    },
    ServerReady,
    Pong,
    AuthError {
        message: String,
    },
    ServerDisconnect,
    Unknown {
        name: String,
        data: Value,
    },
}

impl ChannelEvent {
    /// Wire name of the event, used for logging and rule lookup.
    pub fn name(&self) -> &str {
        match self {
            Self::ChatNewMessage { .. } => "chat:new_message",
            Self::ChatGroupUpdated { .. } => "chat:group_updated",
            Self::ChatGroupMemberAdded { .. } => "chat:group_member_added",
            Self::ChatGroupMemberRemoved { .. } => "chat:group_member_removed",
            Self::ChatMessagesRead => "chat:messages_read",
            Self::NotificationNew { .. } => "notification:new",
            Self::Enhanced { .. } => "enhanced_notification",
            Self::DoctorAssignment { .. } => "notification:doctor_assignment",
            Self::ExaminationCreated { .. } => "notification:examination_created",
            Self::AppointmentCreated { .. } => "notification:appointment_created",
            Self::ProductLowStock { .. } => "notification:product_low_stock",
            Self::PrescriptionCreated { .. } => "notification:prescription_created",
            Self::DailyReport { .. } => "notification:daily_report",
            Self::PendingPrescriptions { .. } => "notification:pending_prescriptions",
            Self::IncompleteExaminations { .. } => "notification:incomplete_examinations",
            Self::SystemNotice { .. } => "notification:system",
            Self::NotificationCount { .. } => "notification:count",
            Self::ServerReady => "server_ready",
            Self::Pong => "pong",
            Self::AuthError { .. } => "auth_error",
            Self::ServerDisconnect => "disconnect",
            Self::Unknown { .. } => "unknown",
        }
    }
}

impl From<WireFrame> for ChannelEvent {
    fn from(frame: WireFrame) -> Self {
        let data = frame.data;
        match frame.event.as_str() {
            "chat:new_message" => Self::ChatNewMessage {
                sender_name: first_string(
                    &data,
                    &[
                        &["message", "sender_name"],
                        &["message", "senderName"],
                        &["sender", "name"],
                        &["senderName"],
                    ],
                )
                .unwrap_or_else(|| "Bilinmeyen Kişi".to_string()),
                content: first_string(&data, &[&["message", "content"], &["content"], &["message"]])
                    .unwrap_or_else(|| "Yeni bir mesaj aldınız".to_string()),
                conversation_id: first_string(&data, &[&["conversationId"]]),
            },
            "chat:group_updated" => Self::ChatGroupUpdated {
                group_name: group_name(&data),
            },
            "chat:group_member_added" => Self::ChatGroupMemberAdded {
                group_name: group_name(&data),
            },
            "chat:group_member_removed" => Self::ChatGroupMemberRemoved {
                group_name: group_name(&data),
            },
            "chat:messages_read" => Self::ChatMessagesRead,
            "notification:new" => Self::NotificationNew {
                title: first_string(&data, &[&["title"]])
                    .unwrap_or_else(|| "Yeni Bildirim".to_string()),
                content: first_string(&data, &[&["content"], &["message"]])
                    .unwrap_or_else(|| "Yeni bir bildiriminiz var".to_string()),
            },
            "enhanced_notification" => Self::Enhanced {
                title: first_string(&data, &[&["title"]])
                    .unwrap_or_else(|| "Yeni Bildirim".to_string()),
                body: first_string(&data, &[&["message"], &["content"]])
                    .unwrap_or_else(|| "Yeni bir bildiriminiz var".to_string()),
                priority: first_string(&data, &[&["priority"]]),
                category: first_string(&data, &[&["category"]]),
            },
            "notification:doctor_assignment" => Self::DoctorAssignment {
                patient_name: patient_name(&data),
                pet_name: pet_name(&data),
                message: first_string(&data, &[&["message"]]),
            },
            "notification:examination_created" => Self::ExaminationCreated {
                patient_name: patient_name(&data),
                pet_name: pet_name(&data),
                message: first_string(&data, &[&["message"]]),
            },
            "notification:appointment_created" => Self::AppointmentCreated {
                patient_name: patient_name(&data),
                pet_name: pet_name(&data),
                message: first_string(&data, &[&["message"]]),
            },
            "notification:product_low_stock" => Self::ProductLowStock {
                product_name: first_string(&data, &[&["productName"], &["product_name"]])
                    .unwrap_or_default(),
                message: first_string(&data, &[&["message"]]),
            },
            "notification:prescription_created" => Self::PrescriptionCreated {
                patient_name: patient_name(&data),
                pet_name: pet_name(&data),
                message: first_string(&data, &[&["message"]]),
            },
            "notification:daily_report" => Self::DailyReport {
                message: first_string(&data, &[&["message"]]),
            },
            "notification:pending_prescriptions" => Self::PendingPrescriptions {
                count: first_u64(&data, &["count"]),
                message: first_string(&data, &[&["message"]]),
            },
            "notification:incomplete_examinations" => Self::IncompleteExaminations {
                count: first_u64(&data, &["count"]),
                message: first_string(&data, &[&["message"]]),
            },
            "notification:system" => Self::SystemNotice {
                message: first_string(&data, &[&["message"]]),
                priority: first_string(&data, &[&["priority"]]),
            },
            "notification:count" => Self::NotificationCount {
                count: first_u64(&data, &["count"]).unwrap_or(0),
            },
            "server_ready" => Self::ServerReady,
            "pong" => Self::Pong,
            "auth_error" => Self::AuthError {
                message: first_string(&data, &[&["message"]])
                    .unwrap_or_else(|| "Token geçersiz".to_string()),
            },
            "disconnect" => Self::ServerDisconnect,
            other => Self::Unknown {
                name: other.to_string(),
                data,
            },
        }
    }
}

fn lookup<'a>(data: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = data;
    for segment in path {
        current = current.get(segment)?;
    }
    Some(current)
}

fn first_string(data: &Value, paths: &[&[&str]]) -> Option<String> {
    paths
        .iter()
        .filter_map(|path| lookup(data, path))
        .find_map(|value| value.as_str())
        .map(|value| value.to_string())
        .filter(|value| !value.is_empty())
}

fn first_u64(data: &Value, path: &[&str]) -> Option<u64> {
    lookup(data, path).and_then(Value::as_u64)
}

fn group_name(data: &Value) -> String {
    first_string(data, &[&["groupName"], &["group_name"]]).unwrap_or_default()
}

fn patient_name(data: &Value) -> String {
    first_string(data, &[&["patientName"], &["patient_name"]]).unwrap_or_default()
}

fn pet_name(data: &Value) -> String {
    first_string(data, &[&["petName"], &["pet_name"]]).unwrap_or_default()
}
