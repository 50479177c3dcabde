use std::fmt;
use std::io::Write;

use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cli::{
    CliCommand, CreateArgs, DashboardArgs, DeleteArgs, ListArgs, LoginArgs, NotificationsArgs,
    ShowArgs, UpdateArgs,
};
use crate::core::{
    parse_filters, AuditLogEntry, Company, Dashboard, DisplayState, Drive, Entity, FetchStatus,
    PlacementService, Resource, Student, ViewDriver, ViewStore,
};

/// Run `$handler::<Entity>(args..)` with the entity type backing `$resource`.
macro_rules! for_resource {
    ($resource:expr, $handler:ident($($arg:expr),* $(,)?)) => {
        match $resource {
            Resource::Companies => $handler::<Company, _>($($arg),*).await,
            Resource::Students => $handler::<Student, _>($($arg),*).await,
            Resource::Drives => $handler::<Drive, _>($($arg),*).await,
            Resource::AuditLogs => $handler::<AuditLogEntry, _>($($arg),*).await,
        }
    };
}

pub async fn execute<W: Write>(
    service: &PlacementService,
    command: CliCommand,
    mut writer: W,
) -> Result<()> {
    match command {
        CliCommand::Login(args) => handle_login(service, &args, &mut writer).await,
        CliCommand::Logout => {
            service.logout()?;
            writeln!(writer, "Signed out")?;
            Ok(())
        }
        CliCommand::List(args) => {
            for_resource!(args.resource, handle_list(service, &args, &mut writer))
        }
        CliCommand::Show(args) => {
            for_resource!(args.resource, handle_show(service, &args, &mut writer))
        }
        CliCommand::Create(args) => {
            ensure_mutable(args.resource)?;
            for_resource!(args.resource, handle_create(service, &args, &mut writer))
        }
        CliCommand::Update(args) => {
            ensure_mutable(args.resource)?;
            for_resource!(args.resource, handle_update(service, &args, &mut writer))
        }
        CliCommand::Delete(args) => {
            ensure_mutable(args.resource)?;
            for_resource!(args.resource, handle_delete(service, &args, &mut writer))
        }
        CliCommand::Dashboard(args) => handle_dashboard(service, &args, &mut writer).await,
        CliCommand::Notifications(args) => handle_notifications(service, &args, &mut writer).await,
    }
}

async fn handle_login<W: Write>(
    service: &PlacementService,
    args: &LoginArgs,
    mut writer: W,
) -> Result<()> {
    service.login(&args.email, &args.password).await?;
    writeln!(writer, "Signed in as {}", args.email)?;
    Ok(())
}

async fn handle_list<T, W>(
    service: &PlacementService,
    args: &ListArgs,
    mut writer: W,
) -> Result<()>
where
    T: Entity + Clone + DeserializeOwned + Send + 'static,
    W: Write,
{
    let filters = parse_filters(&args.filters)?;
    let mut store = service.list_store::<T>(args.resource);

    if let Some(label) = &args.tab {
        let index = store.tab_index(label).ok_or_else(|| {
            let labels: Vec<&str> = store.tabs().iter().map(|tab| tab.label.as_str()).collect();
            anyhow!(
                "Unknown tab '{}' for {}: expected one of {}",
                label,
                args.resource,
                labels.join(", ")
            )
        })?;
        store = store.with_tab(index);
    }
    let store = store
        .with_filters(&filters)
        .with_page(args.page.saturating_sub(1));

    let mut driver = service.drive(args.resource, store);
    driver.load();
    driver.settle().await;

    render_list(driver.store(), args.resource, &mut writer)
}

fn render_list<T, W>(store: &ViewStore<T>, resource: Resource, mut writer: W) -> Result<()>
where
    T: Entity + Clone,
    W: Write,
{
    match store.display() {
        DisplayState::Loading => writeln!(writer, "Still loading {resource}")?,
        DisplayState::Error(message) => bail!("{message}"),
        DisplayState::Empty => writeln!(writer, "No {resource} found")?,
        DisplayState::Rows(rows) => {
            for row in rows {
                writeln!(writer, "{:<26} {:<8} {}", row.id(), row.tone().as_str(), row.summary())?;
            }
        }
    }

    let pagination = store.pagination();
    let mut footer = format!(
        "Page {} of {} ({} total)",
        pagination.page + 1,
        pagination.page_count(),
        pagination.total_count
    );
    if store.tab() > 0 {
        footer.push_str(&format!(" | tab: {}", store.active_tab().label));
    }
    if let Some(summary) = store.filters().summary() {
        footer.push_str(&format!(" | {summary}"));
    }
    writeln!(writer, "{footer}")?;
    Ok(())
}

async fn handle_show<T, W>(
    service: &PlacementService,
    args: &ShowArgs,
    mut writer: W,
) -> Result<()>
where
    T: Entity + DeserializeOwned,
    W: Write,
{
    let raw: Value = service
        .fetch_entity(args.resource, &args.id)
        .await
        .map_err(|err| anyhow!(err.user_message()))?;
    let entity: T = serde_json::from_value(raw.clone())
        .with_context(|| format!("Unexpected {} record shape", args.resource))?;

    writeln!(writer, "{} [{}]", entity.summary(), entity.tone().as_str())?;
    writeln!(writer, "{}", serde_json::to_string_pretty(&raw)?)?;
    Ok(())
}

async fn handle_create<T, W>(
    service: &PlacementService,
    args: &CreateArgs,
    mut writer: W,
) -> Result<()>
where
    T: Entity + Clone + DeserializeOwned + Send + 'static,
    W: Write,
{
    let payload = parse_payload(&args.data)?;
    let mut driver = service.list_view::<T>(args.resource);
    driver.create(payload);
    finish_mutation(&mut driver).await?;
    writeln!(writer, "{}", SummaryLine::Created(args.resource))?;
    Ok(())
}

async fn handle_update<T, W>(
    service: &PlacementService,
    args: &UpdateArgs,
    mut writer: W,
) -> Result<()>
where
    T: Entity + Clone + DeserializeOwned + Send + 'static,
    W: Write,
{
    let payload = parse_payload(&args.data)?;
    let mut driver = service.list_view::<T>(args.resource);
    driver.update(args.id.as_str(), payload);
    finish_mutation(&mut driver).await?;
    writeln!(writer, "{}", SummaryLine::Updated(args.resource, args.id.clone()))?;
    Ok(())
}

async fn handle_delete<T, W>(
    service: &PlacementService,
    args: &DeleteArgs,
    mut writer: W,
) -> Result<()>
where
    T: Entity + Clone + DeserializeOwned + Send + 'static,
    W: Write,
{
    let mut driver = service.list_view::<T>(args.resource);
    let mut summary = DeleteSummary::new(args.resource);
    for id in &args.ids {
        driver.delete(id.as_str());
        match finish_mutation(&mut driver).await {
            Ok(()) => summary.deleted += 1,
            Err(err) => summary.failed.push((id.clone(), err.to_string())),
        }
    }
    summary.write_to(&mut writer)?;
    Ok(())
}

async fn finish_mutation<T>(driver: &mut ViewDriver<T>) -> Result<()>
where
    T: Entity + Clone + DeserializeOwned + Send + 'static,
{
    driver.settle().await;
    match driver.actions().error() {
        Some(message) => Err(anyhow!(message.to_string())),
        None => Ok(()),
    }
}

async fn handle_dashboard<W: Write>(
    service: &PlacementService,
    args: &DashboardArgs,
    mut writer: W,
) -> Result<()> {
    let mut dashboard = Dashboard::new();
    for (key, value) in parse_filters(&args.filters)?.iter() {
        dashboard.set_filter(key, value);
    }
    service.load_dashboard(&mut dashboard).await;

    let state = dashboard.state();
    let stats = match (state.status, state.data.as_ref()) {
        (FetchStatus::Success, Some(stats)) => stats,
        _ => bail!(
            "{}",
            state.error.as_deref().unwrap_or("Dashboard statistics are unavailable")
        ),
    };

    writeln!(writer, "Students:  {} ({} placed)", stats.total_students, stats.placed_students)?;
    writeln!(writer, "Companies: {}", stats.total_companies)?;
    writeln!(writer, "Active drives: {}", stats.active_drives)?;
    if let Some(rate) = stats.placement_rate() {
        writeln!(writer, "Placement rate: {rate:.1}%")?;
    }
    if let Some(average) = stats.average_package_lpa {
        writeln!(writer, "Average package: {average:.2} LPA")?;
    }
    if let Some(highest) = stats.highest_package_lpa {
        writeln!(writer, "Highest package: {highest:.2} LPA")?;
    }
    Ok(())
}

async fn handle_notifications<W: Write>(
    service: &PlacementService,
    args: &NotificationsArgs,
    mut writer: W,
) -> Result<()> {
    let Some(updates) = args.watch else {
        let count = service
            .unread_count()
            .await
            .map_err(|err| anyhow!(err.user_message()))?;
        writeln!(writer, "{}", SummaryLine::Unread(count))?;
        return Ok(());
    };

    let (poller, mut receiver) = service.watch_unread();
    for _ in 0..updates {
        if receiver.changed().await.is_err() {
            break;
        }
        let latest = *receiver.borrow_and_update();
        if let Some(count) = latest {
            writeln!(writer, "{}", SummaryLine::Unread(count))?;
        }
    }
    poller.shutdown().await;
    Ok(())
}

fn parse_payload(raw: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(raw).context("--data must be valid JSON")?;
    if !value.is_object() {
        bail!("--data must be a JSON object");
    }
    Ok(value)
}

fn ensure_mutable(resource: Resource) -> Result<()> {
    if resource.is_mutable() {
        Ok(())
    } else {
        Err(anyhow!("{resource} are read-only"))
    }
}

struct DeleteSummary {
    resource: Resource,
    deleted: usize,
    failed: Vec<(String, String)>,
}

impl DeleteSummary {
    fn new(resource: Resource) -> Self {
        Self {
            resource,
            deleted: 0,
            failed: Vec::new(),
        }
    }

    fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "{}", SummaryLine::deleted(self.resource, self.deleted))?;
        for (id, message) in &self.failed {
            writeln!(writer, "Not deleted: {id} ({message})")?;
        }
        Ok(())
    }
}

enum SummaryLine {
    Created(Resource),
    Updated(Resource, String),
    Deleted(Resource, usize),
    NoneDeleted(Resource),
    Unread(u64),
}

impl SummaryLine {
    fn deleted(resource: Resource, count: usize) -> Self {
        if count > 0 {
            SummaryLine::Deleted(resource, count)
        } else {
            SummaryLine::NoneDeleted(resource)
        }
    }
}

impl fmt::Display for SummaryLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryLine::Created(resource) => write!(f, "Created a record in {resource}"),
            SummaryLine::Updated(resource, id) => write!(f, "Updated {resource}/{id}"),
            SummaryLine::Deleted(resource, count) => write!(
                f,
                "Deleted {} record{} from {}",
                count,
                if *count == 1 { "" } else { "s" },
                resource
            ),
            SummaryLine::NoneDeleted(resource) => write!(f, "Nothing deleted from {resource}"),
            SummaryLine::Unread(count) => write!(
                f,
                "{} unread notification{}",
                count,
                if *count == 1 { "" } else { "s" }
            ),
        }
    }
}
