//! State changes that notify someone

use crate::notify::request::{NotificationRequest, Priority};
use crate::types::ClientId;

/// Events raised by the staff app and the client portal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// A client signed her service contract; admins are told
    ContractSigned {
        client_id: ClientId,
        client_name: String,
    },
    /// The doula sent a budget; the client is told
    BudgetSent {
        client_id: ClientId,
        service_name: String,
    },
    /// A client accepted a budget; admins are told
    ServiceAccepted {
        client_id: ClientId,
        client_name: String,
        service_name: String,
    },
}

impl Trigger {
    pub fn to_request(&self) -> NotificationRequest {
        match self {
            Trigger::ContractSigned {
                client_id,
                client_name,
            } => NotificationRequest {
                url: Some(format!("/clientes/{}", client_id)),
                tag: Some(format!("contract-{}", client_id)),
                kind: Some("contract".to_string()),
                priority: Some(Priority::High),
                require_interaction: Some(true),
                ..NotificationRequest::new(
                    "Contrato assinado",
                    format!("{} assinou o contrato", client_name),
                )
                .to_admins()
            },
            Trigger::BudgetSent {
                client_id,
                service_name,
            } => NotificationRequest {
                url: Some("/cliente/servicos".to_string()),
                tag: Some(format!("budget-{}", client_id)),
                kind: Some("budget".to_string()),
                ..NotificationRequest::new(
                    "Novo orçamento",
                    format!("Você recebeu um orçamento para {}", service_name),
                )
                .to_clients(vec![*client_id])
            },
            Trigger::ServiceAccepted {
                client_id,
                client_name,
                service_name,
            } => NotificationRequest {
                url: Some(format!("/clientes/{}", client_id)),
                tag: Some(format!("service-{}", client_id)),
                kind: Some("service".to_string()),
                priority: Some(Priority::High),
                ..NotificationRequest::new(
                    "Serviço aceito",
                    format!("{} aceitou o orçamento de {}", client_name, service_name),
                )
                .to_admins()
            },
        }
    }
}
