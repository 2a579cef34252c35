//! Stage and external-table provisioning
//!
//! Replicated workspace files land in an object-store bucket. Each upstream
//! asset gets a warehouse stage over its prefix, and each stage gets an
//! external table partitioned by replication date.
//!
//! Provisioning is idempotent: a stage that already exists is refreshed, and
//! external tables are always recreated.

use assetlink_core::domain::asset::{AssetKey, AssetSpec, AutomationPolicy};
use tracing::{debug, info, warn};

use crate::error::{ConnectorError, Result};
use crate::sql::{Connection, Warehouse, is_identifier, is_storage_path};

/// First key segment of every provisioned asset
pub const KEY_ROOT: &str = "aws";

/// Prefix of stage names
pub const STAGE_PREFIX: &str = "workspace_staging_";

/// Suffix of external table names
pub const EXTERNAL_TABLE_SUFFIX: &str = "_ext";

/// Role used when none is configured
pub const DEFAULT_ROLE: &str = "AWS_WRITER";

/// Database holding the per-account schemas
pub const DATABASE: &str = "AWS";

/// Group of stage specs
pub const STAGES_GROUP: &str = "aws_stages";

/// Group of external table specs
pub const EXTERNAL_TABLES_GROUP: &str = "aws_external_tables";

/// Schedule shared by every provisioned asset
pub const DAILY: &str = "@daily";

/// What provisioning did for one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Created,
    Refreshed,
}

/// Outcome of provisioning one selected stage key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageAction {
    pub key: AssetKey,
    pub outcome: StageOutcome,
}

/// Provisions warehouse stages and external tables for replicated files
#[derive(Debug, Clone)]
pub struct StageProvisioner {
    account: String,
    role: String,
    storage_integration: String,
    bucket: String,
    prefix: String,
}

impl StageProvisioner {
    /// Creates a provisioner for `account`
    ///
    /// # Arguments
    /// * `account` - Account name as it appears in stage keys (e.g. "cloud-prod")
    /// * `storage_integration` - Warehouse integration granting bucket access
    /// * `bucket` - Bucket holding replicated files
    /// * `prefix` - Key prefix under which each object has its own folder
    pub fn new(
        account: impl Into<String>,
        storage_integration: impl Into<String>,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            role: DEFAULT_ROLE.to_string(),
            storage_integration: storage_integration.into(),
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// Account name usable as a schema name
    pub fn account_snake(&self) -> String {
        self.account.replace('-', "_")
    }

    /// Checks that every configured name is safe to splice into SQL
    pub fn validate(&self) -> Result<()> {
        for name in [&self.role, &self.storage_integration, &self.account_snake()] {
            if !is_identifier(name) {
                return Err(ConnectorError::InvalidIdentifier(name.clone()));
            }
        }
        for path in [&self.bucket, &self.prefix] {
            if !is_storage_path(path) {
                return Err(ConnectorError::InvalidStoragePath(path.clone()));
            }
        }
        Ok(())
    }

    /// One stage spec per upstream asset
    ///
    /// Keys are `["aws", <account>, "workspace_staging_<upstream name>"]`.
    pub fn stage_specs(&self, upstream: &[AssetKey]) -> Result<Vec<AssetSpec>> {
        upstream
            .iter()
            .map(|dep| {
                let key = AssetKey::new([
                    KEY_ROOT.to_string(),
                    self.account.clone(),
                    format!("{}{}", STAGE_PREFIX, dep.name()),
                ])?;
                Ok(daily_spec(key, dep.clone(), STAGES_GROUP))
            })
            .collect()
    }

    /// One external table spec per stage
    ///
    /// Keys are `["aws", <account_snake>, "<stage>_ext"]`.
    pub fn external_table_specs(&self, stage_keys: &[AssetKey]) -> Result<Vec<AssetSpec>> {
        stage_keys
            .iter()
            .map(|stage| {
                let key = AssetKey::new([
                    KEY_ROOT.to_string(),
                    self.account_snake(),
                    format!("{}{}", stage.name(), EXTERNAL_TABLE_SUFFIX),
                ])?;
                Ok(daily_spec(key, stage.clone(), EXTERNAL_TABLES_GROUP))
            })
            .collect()
    }

    /// Creates missing stages and refreshes existing ones
    ///
    /// Uses one session for the whole run. The session is closed whether or
    /// not provisioning succeeds.
    pub async fn provision_stages(
        &self,
        warehouse: &dyn Warehouse,
        selected: &[AssetKey],
    ) -> Result<Vec<StageAction>> {
        self.validate()?;
        let mut conn = warehouse.connect().await?;
        let result = self.run_stages(conn.as_mut(), selected).await;
        finish(conn.as_mut(), result).await
    }

    /// Recreates the external table of every selected key
    ///
    /// Returns the keys of the tables created, in selection order.
    pub async fn provision_external_tables(
        &self,
        warehouse: &dyn Warehouse,
        selected: &[AssetKey],
    ) -> Result<Vec<AssetKey>> {
        self.validate()?;
        let mut conn = warehouse.connect().await?;
        let result = self.run_external_tables(conn.as_mut(), selected).await;
        finish(conn.as_mut(), result).await
    }

    async fn run_stages(
        &self,
        conn: &mut dyn Connection,
        selected: &[AssetKey],
    ) -> Result<Vec<StageAction>> {
        conn.execute(&format!("USE ROLE {};", self.role)).await?;

        let mut actions = Vec::with_capacity(selected.len());
        for key in selected {
            let stage = stage_name(key)?;
            let object = &stage[STAGE_PREFIX.len()..];

            conn.execute(&self.use_schema()).await?;
            let existing = conn
                .fetch_all(&format!("SHOW STAGES LIKE '{}';", stage))
                .await?;

            let outcome = if existing.is_empty() {
                conn.execute(&self.create_stage_sql(stage, object)).await?;
                info!(stage = stage, "Created stage");
                StageOutcome::Created
            } else {
                conn.execute(&format!("ALTER STAGE {} REFRESH;", stage))
                    .await?;
                info!(stage = stage, "Refreshed stage");
                StageOutcome::Refreshed
            };

            actions.push(StageAction {
                key: key.clone(),
                outcome,
            });
        }

        Ok(actions)
    }

    async fn run_external_tables(
        &self,
        conn: &mut dyn Connection,
        selected: &[AssetKey],
    ) -> Result<Vec<AssetKey>> {
        conn.execute(&format!("USE ROLE {};", self.role)).await?;

        let mut created = Vec::with_capacity(selected.len());
        for key in selected {
            let table = external_table_name(key)?;
            let stage = &table[..table.len() - EXTERNAL_TABLE_SUFFIX.len()];

            conn.execute(&self.use_schema()).await?;
            conn.execute(&create_external_table_sql(table, stage))
                .await?;
            info!(table = table, stage = stage, "Created external table");
            created.push(key.clone());
        }

        Ok(created)
    }

    fn use_schema(&self) -> String {
        format!("USE SCHEMA {}.{};", DATABASE, self.account_snake())
    }

    fn create_stage_sql(&self, stage: &str, object: &str) -> String {
        format!(
            "CREATE STAGE {stage} \
             URL='s3://{bucket}/{prefix}/{object}' \
             STORAGE_INTEGRATION = {integration} \
             FILE_FORMAT = (TYPE = 'JSON', COMPRESSION = 'AUTO', STRIP_OUTER_ARRAY = TRUE) \
             DIRECTORY = (ENABLE = TRUE);",
            stage = stage,
            bucket = self.bucket,
            prefix = self.prefix,
            object = object,
            integration = self.storage_integration,
        )
    }
}

fn daily_spec(key: AssetKey, dep: AssetKey, group: &str) -> AssetSpec {
    AssetSpec::new(key)
        .with_deps(vec![dep])
        .with_automation_policy(Some(AutomationPolicy::OnCron(DAILY.to_string())))
        .with_group_name(Some(group.to_string()))
}

fn stage_name(key: &AssetKey) -> Result<&str> {
    let name = key.name();
    if !name.starts_with(STAGE_PREFIX) || name.len() == STAGE_PREFIX.len() {
        return Err(ConnectorError::unexpected_key(
            key,
            format!("stage names start with '{}'", STAGE_PREFIX),
        ));
    }
    if !is_identifier(name) {
        return Err(ConnectorError::InvalidIdentifier(name.to_string()));
    }
    Ok(name)
}

fn external_table_name(key: &AssetKey) -> Result<&str> {
    let name = key.name();
    if !name.ends_with(EXTERNAL_TABLE_SUFFIX) || name.len() == EXTERNAL_TABLE_SUFFIX.len() {
        return Err(ConnectorError::unexpected_key(
            key,
            format!("external table names end with '{}'", EXTERNAL_TABLE_SUFFIX),
        ));
    }
    if !is_identifier(name) {
        return Err(ConnectorError::InvalidIdentifier(name.to_string()));
    }
    Ok(name)
}

fn create_external_table_sql(table: &str, stage: &str) -> String {
    format!(
        "CREATE OR REPLACE EXTERNAL TABLE {table}( \
         FILENAME VARCHAR AS METADATA$FILENAME, \
         REPLICATION_DATE DATE AS cast(split_part(METADATA$FILENAME, '/', 3) as date), \
         ORGANIZATION_ID VARCHAR AS split_part(METADATA$FILENAME, '/', 4), \
         DEPLOYMENT_ID VARCHAR AS split_part(METADATA$FILENAME, '/', 5), \
         CODE_LOCATION VARCHAR AS replace(split_part(METADATA$FILENAME, '/', 6), '.json') \
         ) \
         PARTITION BY (REPLICATION_DATE) \
         LOCATION = @{stage} \
         FILE_FORMAT = (TYPE = 'JSON', COMPRESSION = 'AUTO', STRIP_OUTER_ARRAY = TRUE) \
         AUTO_REFRESH = FALSE \
         COMMENT = 'External table for stage {stage} from workspace replication';",
        table = table,
        stage = stage,
    )
}

/// Closes `conn` and returns the provisioning result
///
/// A provisioning error takes precedence over a close error.
async fn finish<T>(conn: &mut dyn Connection, result: Result<T>) -> Result<T> {
    let closed = conn.close().await;
    match (result, closed) {
        (Ok(value), Ok(())) => {
            debug!("Warehouse session closed");
            Ok(value)
        }
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            warn!("Failed to close warehouse session: {}", close_err);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::Row;
    use assetlink_core::domain::metadata::MetadataValue;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Log {
        statements: Vec<String>,
        opened: usize,
        closed: usize,
    }

    /// In-memory warehouse that records every statement
    struct MockWarehouse {
        existing_stages: Vec<String>,
        fail_on: Option<&'static str>,
        log: Arc<Mutex<Log>>,
    }

    impl MockWarehouse {
        fn new(existing_stages: &[&str]) -> Self {
            Self {
                existing_stages: existing_stages.iter().map(|s| s.to_string()).collect(),
                fail_on: None,
                log: Arc::new(Mutex::new(Log::default())),
            }
        }

        fn statements(&self) -> Vec<String> {
            self.log.lock().unwrap().statements.clone()
        }
    }

    struct MockConnection {
        existing_stages: Vec<String>,
        fail_on: Option<&'static str>,
        log: Arc<Mutex<Log>>,
    }

    #[async_trait]
    impl Warehouse for MockWarehouse {
        async fn connect(&self) -> Result<Box<dyn Connection>> {
            self.log.lock().unwrap().opened += 1;
            Ok(Box::new(MockConnection {
                existing_stages: self.existing_stages.clone(),
                fail_on: self.fail_on,
                log: Arc::clone(&self.log),
            }))
        }
    }

    #[async_trait]
    impl Connection for MockConnection {
        async fn execute(&mut self, sql: &str) -> Result<()> {
            self.log.lock().unwrap().statements.push(sql.to_string());
            match self.fail_on {
                Some(fragment) if sql.contains(fragment) => {
                    Err(ConnectorError::sql(format!("rejected: {}", fragment)))
                }
                _ => Ok(()),
            }
        }

        async fn fetch_all(&mut self, sql: &str) -> Result<Vec<Row>> {
            self.log.lock().unwrap().statements.push(sql.to_string());
            Ok(self
                .existing_stages
                .iter()
                .filter(|stage| sql.contains(&format!("'{}'", stage)))
                .map(|stage| vec![MetadataValue::from(stage.as_str())])
                .collect())
        }

        async fn close(&mut self) -> Result<()> {
            self.log.lock().unwrap().closed += 1;
            Ok(())
        }
    }

    fn provisioner() -> StageProvisioner {
        StageProvisioner::new(
            "cloud-prod",
            "CLOUD_PROD_WORKSPACE_REPLICATION",
            "replication-bucket",
            "workspaces",
        )
    }

    fn key(path: &[&str]) -> AssetKey {
        AssetKey::new(path.iter().copied()).unwrap()
    }

    #[test]
    fn test_stage_specs() {
        let specs = provisioner()
            .stage_specs(&[key(&["aws", "workspace", "assets"])])
            .unwrap();

        assert_eq!(specs.len(), 1);
        assert_eq!(
            specs[0].key,
            key(&["aws", "cloud-prod", "workspace_staging_assets"])
        );
        assert_eq!(specs[0].deps, vec![key(&["aws", "workspace", "assets"])]);
        assert_eq!(specs[0].group_name.as_deref(), Some(STAGES_GROUP));
        assert_eq!(
            specs[0].automation_policy,
            Some(AutomationPolicy::OnCron("@daily".to_string()))
        );
    }

    #[test]
    fn test_external_table_specs_use_snake_account() {
        let stage = key(&["aws", "cloud-prod", "workspace_staging_assets"]);
        let specs = provisioner().external_table_specs(&[stage.clone()]).unwrap();

        assert_eq!(
            specs[0].key,
            key(&["aws", "cloud_prod", "workspace_staging_assets_ext"])
        );
        assert_eq!(specs[0].deps, vec![stage]);
        assert_eq!(specs[0].group_name.as_deref(), Some(EXTERNAL_TABLES_GROUP));
    }

    #[tokio::test]
    async fn test_provision_creates_missing_and_refreshes_existing() {
        let warehouse = MockWarehouse::new(&["workspace_staging_runs"]);
        let selected = [
            key(&["aws", "cloud-prod", "workspace_staging_assets"]),
            key(&["aws", "cloud-prod", "workspace_staging_runs"]),
        ];

        let actions = provisioner()
            .provision_stages(&warehouse, &selected)
            .await
            .unwrap();

        assert_eq!(
            actions,
            vec![
                StageAction {
                    key: selected[0].clone(),
                    outcome: StageOutcome::Created,
                },
                StageAction {
                    key: selected[1].clone(),
                    outcome: StageOutcome::Refreshed,
                },
            ]
        );

        let statements = warehouse.statements();
        assert_eq!(statements[0], "USE ROLE AWS_WRITER;");
        assert_eq!(statements[1], "USE SCHEMA AWS.cloud_prod;");
        assert_eq!(statements[2], "SHOW STAGES LIKE 'workspace_staging_assets';");
        assert!(statements[3].starts_with("CREATE STAGE workspace_staging_assets "));
        assert!(statements[3].contains("URL='s3://replication-bucket/workspaces/assets'"));
        assert!(statements[3].contains("STORAGE_INTEGRATION = CLOUD_PROD_WORKSPACE_REPLICATION"));
        assert_eq!(statements[6], "ALTER STAGE workspace_staging_runs REFRESH;");
        assert_eq!(statements.len(), 7);

        let log = warehouse.log.lock().unwrap();
        assert_eq!((log.opened, log.closed), (1, 1));
    }

    #[tokio::test]
    async fn test_connection_closed_on_failure() {
        let mut warehouse = MockWarehouse::new(&[]);
        warehouse.fail_on = Some("CREATE STAGE");
        let selected = [key(&["aws", "cloud-prod", "workspace_staging_assets"])];

        let err = provisioner()
            .provision_stages(&warehouse, &selected)
            .await
            .unwrap_err();

        assert!(matches!(err, ConnectorError::Sql(_)));
        let log = warehouse.log.lock().unwrap();
        assert_eq!((log.opened, log.closed), (1, 1));
    }

    #[tokio::test]
    async fn test_unexpected_stage_key_is_rejected() {
        let warehouse = MockWarehouse::new(&[]);
        let err = provisioner()
            .provision_stages(&warehouse, &[key(&["aws", "cloud-prod", "assets"])])
            .await
            .unwrap_err();

        assert!(matches!(err, ConnectorError::UnexpectedKey { .. }));
        assert_eq!(warehouse.log.lock().unwrap().closed, 1);
    }

    #[tokio::test]
    async fn test_provision_external_tables() {
        let warehouse = MockWarehouse::new(&[]);
        let selected = [key(&["aws", "cloud_prod", "workspace_staging_assets_ext"])];

        let created = provisioner()
            .provision_external_tables(&warehouse, &selected)
            .await
            .unwrap();

        assert_eq!(created, selected.to_vec());
        let statements = warehouse.statements();
        assert_eq!(statements[0], "USE ROLE AWS_WRITER;");
        assert!(statements[2].starts_with(
            "CREATE OR REPLACE EXTERNAL TABLE workspace_staging_assets_ext("
        ));
        assert!(statements[2].contains("LOCATION = @workspace_staging_assets "));
        assert!(statements[2].contains("PARTITION BY (REPLICATION_DATE)"));
    }

    #[tokio::test]
    async fn test_invalid_role_never_connects() {
        let warehouse = MockWarehouse::new(&[]);
        let err = provisioner()
            .with_role("AWS WRITER")
            .provision_stages(&warehouse, &[])
            .await
            .unwrap_err();

        assert!(matches!(err, ConnectorError::InvalidIdentifier(ref name) if name == "AWS WRITER"));
        assert_eq!(warehouse.log.lock().unwrap().opened, 0);
    }

    #[tokio::test]
    async fn test_quoted_bucket_never_connects() {
        let warehouse = MockWarehouse::new(&[]);
        let err = StageProvisioner::new(
            "cloud-prod",
            "CLOUD_PROD_WORKSPACE_REPLICATION",
            "replication-bucket'; DROP STAGE x; --",
            "workspaces",
        )
        .provision_stages(&warehouse, &[])
        .await
        .unwrap_err();

        assert!(matches!(err, ConnectorError::InvalidStoragePath(ref path) if path.starts_with("replication-bucket'")));
        assert_eq!(warehouse.log.lock().unwrap().opened, 0);
    }

    #[test]
    fn test_validate_rejects_unsafe_prefix() {
        let provisioner = StageProvisioner::new(
            "cloud-prod",
            "CLOUD_PROD_WORKSPACE_REPLICATION",
            "replication-bucket",
            "workspaces/../other",
        );
        assert!(matches!(
            provisioner.validate(),
            Err(ConnectorError::InvalidStoragePath(ref path)) if path == "workspaces/../other"
        ));
        assert!(self::provisioner().validate().is_ok());
    }
}
