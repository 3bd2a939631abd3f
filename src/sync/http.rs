use chrono::NaiveDate;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::auth::Session;
use super::gateway::Gateway;
use crate::config::PlannerConfig;
use crate::core::calendar::format_date;
use crate::core::{
    Agenda, AgendaAction, AgendaChanges, AgendaId, AgendaItem, AgendaQuery, DayItem, ItemChanges,
    ItemId,
};
use crate::{PlannerError, Result};

#[derive(Serialize)]
struct CreateDayItem<'a> {
    day: String,
    text: &'a str,
}

#[derive(Serialize)]
struct CreateAgendaItem<'a> {
    agenda_id: AgendaId,
    text: &'a str,
}

#[derive(Serialize)]
struct UpdateAgendaItem<'a> {
    agenda_id: AgendaId,
    #[serde(flatten)]
    changes: &'a ItemChanges,
}

#[derive(Serialize)]
struct ReorderDayItems<'a> {
    day: String,
    ordered_item_ids: &'a [ItemId],
}

#[derive(Serialize)]
struct ReorderAgendaItems<'a> {
    agenda_id: AgendaId,
    ordered_item_ids: &'a [ItemId],
}

#[derive(Serialize)]
struct ReorderAgendas<'a> {
    ordered_agenda_ids: &'a [AgendaId],
}

#[derive(Serialize)]
struct TargetDay {
    day: String,
}

#[derive(Serialize)]
struct TargetAgenda {
    agenda_id: AgendaId,
}

#[derive(Serialize)]
struct CreateAgenda<'a> {
    name: &'a str,
    agenda_type: &'static str,
}

#[derive(Serialize)]
struct RunAction {
    action: AgendaAction,
}

/// Query pairs for a flat array parameter: `days=a&days=b`, no brackets.
fn repeated<T: ToString>(name: &'static str, values: &[T]) -> Vec<(&'static str, String)> {
    values.iter().map(|v| (name, v.to_string())).collect()
}

fn agenda_query_pairs(query: &AgendaQuery) -> Vec<(&'static str, String)> {
    let types: Vec<&str> = query.agenda_types.iter().map(|t| t.as_str()).collect();
    let mut pairs = repeated("agenda_types", &types);
    if let Some(day) = query.selected_day {
        pairs.push(("selected_day", format_date(day)));
    }
    if query.with_counts {
        pairs.push(("with_counts", "true".to_string()));
    }
    pairs
}

/// REST implementation of [`Gateway`] on reqwest.
pub struct HttpGateway {
    base_url: String,
    http: Client,
    session: Arc<Session>,
}

impl HttpGateway {
    pub fn new(config: &PlannerConfig, session: Arc<Session>) -> Result<Self> {
        let http = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self {
            base_url: config.planner_url(),
            http,
            session,
        })
    }

    fn days_url(&self) -> String {
        format!("{}/days/items", self.base_url)
    }

    fn agendas_url(&self) -> String {
        format!("{}/agendas", self.base_url)
    }

    fn agenda_items_url(&self) -> String {
        format!("{}/agendas/items", self.base_url)
    }

    fn request(&self, method: Method, url: &str) -> Result<RequestBuilder> {
        let token = self.session.token().ok_or(PlannerError::NotAuthenticated)?;
        log::debug!("{} {}", method, url);
        Ok(self
            .http
            .request(method, url)
            .header(AUTHORIZATION, token.authorization()))
    }

    async fn check(resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        log::warn!("Request failed with {}: {}", status, body);
        Err(PlannerError::from_status(status, body))
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let resp = Self::check(builder.send().await?).await?;
        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<()> {
        Self::check(builder.send().await?).await?;
        Ok(())
    }
}

impl Gateway for HttpGateway {
    async fn fetch_day_items(
        &self,
        days: &[NaiveDate],
    ) -> Result<BTreeMap<NaiveDate, Vec<DayItem>>> {
        let days: Vec<String> = days.iter().copied().map(format_date).collect();
        let url = format!("{}/", self.days_url());
        self.send_json(self.request(Method::GET, &url)?.query(&repeated("days", &days)))
            .await
    }

    async fn create_day_item(&self, day: NaiveDate, text: &str) -> Result<DayItem> {
        let url = format!("{}/", self.days_url());
        let body = CreateDayItem {
            day: format_date(day),
            text,
        };
        self.send_json(self.request(Method::POST, &url)?.json(&body)).await
    }

    async fn update_day_item(&self, id: ItemId, changes: &ItemChanges) -> Result<DayItem> {
        let url = format!("{}/{}/", self.days_url(), id);
        self.send_json(self.request(Method::PUT, &url)?.json(changes)).await
    }

    async fn delete_day_item(&self, id: ItemId) -> Result<()> {
        let url = format!("{}/{}/", self.days_url(), id);
        self.send_empty(self.request(Method::DELETE, &url)?).await
    }

    async fn reorder_day_items(&self, day: NaiveDate, ordered: &[ItemId]) -> Result<()> {
        let url = format!("{}/reorder/", self.days_url());
        let body = ReorderDayItems {
            day: format_date(day),
            ordered_item_ids: ordered,
        };
        self.send_empty(self.request(Method::POST, &url)?.json(&body)).await
    }

    async fn copy_day_item(&self, id: ItemId, day: NaiveDate) -> Result<DayItem> {
        let url = format!("{}/{}/copy/", self.days_url(), id);
        let body = TargetDay { day: format_date(day) };
        self.send_json(self.request(Method::POST, &url)?.json(&body)).await
    }

    async fn move_day_item(&self, id: ItemId, day: NaiveDate) -> Result<DayItem> {
        let url = format!("{}/{}/move/", self.days_url(), id);
        let body = TargetDay { day: format_date(day) };
        self.send_json(self.request(Method::POST, &url)?.json(&body)).await
    }

    async fn snooze_day_item(&self, id: ItemId, day: NaiveDate) -> Result<DayItem> {
        let url = format!("{}/{}/snooze/", self.days_url(), id);
        let body = TargetDay { day: format_date(day) };
        self.send_json(self.request(Method::POST, &url)?.json(&body)).await
    }

    async fn fetch_agenda_items(
        &self,
        agendas: &[AgendaId],
    ) -> Result<BTreeMap<AgendaId, Vec<AgendaItem>>> {
        let url = format!("{}/", self.agenda_items_url());
        self.send_json(self.request(Method::GET, &url)?.query(&repeated("agenda_ids", agendas)))
            .await
    }

    async fn create_agenda_item(&self, agenda: AgendaId, text: &str) -> Result<AgendaItem> {
        let url = format!("{}/", self.agenda_items_url());
        let body = CreateAgendaItem {
            agenda_id: agenda,
            text,
        };
        self.send_json(self.request(Method::POST, &url)?.json(&body)).await
    }

    async fn update_agenda_item(
        &self,
        id: ItemId,
        agenda: AgendaId,
        changes: &ItemChanges,
    ) -> Result<AgendaItem> {
        let url = format!("{}/{}/", self.agenda_items_url(), id);
        let body = UpdateAgendaItem {
            agenda_id: agenda,
            changes,
        };
        self.send_json(self.request(Method::PUT, &url)?.json(&body)).await
    }

    async fn delete_agenda_item(&self, id: ItemId) -> Result<()> {
        let url = format!("{}/{}/", self.agenda_items_url(), id);
        self.send_empty(self.request(Method::DELETE, &url)?).await
    }

    async fn reorder_agenda_items(&self, agenda: AgendaId, ordered: &[ItemId]) -> Result<()> {
        let url = format!("{}/reorder/", self.agenda_items_url());
        let body = ReorderAgendaItems {
            agenda_id: agenda,
            ordered_item_ids: ordered,
        };
        self.send_empty(self.request(Method::POST, &url)?.json(&body)).await
    }

    async fn copy_agenda_item(&self, id: ItemId, agenda: AgendaId) -> Result<AgendaItem> {
        let url = format!("{}/{}/copy/", self.agenda_items_url(), id);
        let body = TargetAgenda { agenda_id: agenda };
        self.send_json(self.request(Method::POST, &url)?.json(&body)).await
    }

    async fn move_agenda_item(&self, id: ItemId, agenda: AgendaId) -> Result<AgendaItem> {
        let url = format!("{}/{}/move/", self.agenda_items_url(), id);
        let body = TargetAgenda { agenda_id: agenda };
        self.send_json(self.request(Method::POST, &url)?.json(&body)).await
    }

    async fn list_agendas(&self, query: &AgendaQuery) -> Result<Vec<Agenda>> {
        let url = format!("{}/", self.agendas_url());
        self.send_json(self.request(Method::GET, &url)?.query(&agenda_query_pairs(query)))
            .await
    }

    async fn create_agenda(&self, name: &str) -> Result<Agenda> {
        let url = format!("{}/", self.agendas_url());
        let body = CreateAgenda {
            name,
            agenda_type: "custom",
        };
        self.send_json(self.request(Method::POST, &url)?.json(&body)).await
    }

    async fn update_agenda(&self, id: AgendaId, changes: &AgendaChanges) -> Result<Agenda> {
        let url = format!("{}/{}/", self.agendas_url(), id);
        self.send_json(self.request(Method::PUT, &url)?.json(changes)).await
    }

    async fn delete_agenda(&self, id: AgendaId) -> Result<()> {
        let url = format!("{}/{}/", self.agendas_url(), id);
        self.send_empty(self.request(Method::DELETE, &url)?).await
    }

    async fn reorder_agendas(&self, ordered: &[AgendaId]) -> Result<()> {
        let url = format!("{}/reorder/", self.agendas_url());
        let body = ReorderAgendas {
            ordered_agenda_ids: ordered,
        };
        self.send_empty(self.request(Method::POST, &url)?.json(&body)).await
    }

    async fn run_agenda_action(&self, id: AgendaId, action: AgendaAction) -> Result<()> {
        let url = format!("{}/{}/action/", self.agendas_url(), id);
        self.send_empty(self.request(Method::POST, &url)?.json(&RunAction { action }))
            .await
    }
}
