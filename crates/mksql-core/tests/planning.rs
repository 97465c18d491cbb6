//! Integration tests for planning against described live tables.
//!
//! The MySQL fixtures are the literal `SHOW CREATE TABLE` output MySQL 8
//! returns after running the generated DDL. The SQLite fixtures are the
//! `sqlite_master` rows SQLite stores for it.

use mksql_core::introspect::{parse_show_create_table, parse_sqlite_master, MasterRow};
use mksql_core::{
    dependency_order, plan_table, DefaultValue, Dialect, QueryKind, SchemaRegistry,
    TableDescription,
};

fn shop_registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();

    let mut accounts = registry.register_table("accounts").unwrap();
    accounts.set_comment(Some("registered users")).unwrap();
    accounts
        .create_column("login", "varchar(60)")
        .unwrap()
        .set_unique(true);
    accounts
        .create_column("role", "varchar(20)")
        .unwrap()
        .set_default(Some(DefaultValue::from("guest")))
        .unwrap()
        .set_comment(Some("user's role"))
        .unwrap();
    accounts
        .create_column("score", "decimal(10, 2)")
        .unwrap()
        .set_not_null(true)
        .set_default(Some(DefaultValue::Integer(0)))
        .unwrap();
    accounts
        .create_column("active", "bool")
        .unwrap()
        .set_not_null(true)
        .set_default(Some(DefaultValue::Bool(true)))
        .unwrap();

    registry
        .register_table("sessions")
        .unwrap()
        .create_column("account", "int")
        .unwrap()
        .add_foreign_key("accounts.id")
        .unwrap();
    registry
}

const MYSQL_ACCOUNTS: &str = "CREATE TABLE `accounts` (
  `id` int NOT NULL AUTO_INCREMENT,
  `login` varchar(60) NOT NULL,
  `role` varchar(20) DEFAULT 'guest' COMMENT 'user''s role',
  `score` decimal(10,2) NOT NULL DEFAULT '0.00',
  `active` tinyint(1) NOT NULL DEFAULT '1',
  PRIMARY KEY (`id`),
  UNIQUE KEY `accounts_login_mksql_uindex` (`login`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_0900_ai_ci COMMENT='registered users'";

const MYSQL_SESSIONS: &str = "CREATE TABLE `sessions` (
  `id` int NOT NULL AUTO_INCREMENT,
  `account` int DEFAULT NULL,
  PRIMARY KEY (`id`),
  KEY `sessions_accounts_account_id_mksql_fk` (`account`),
  CONSTRAINT `sessions_accounts_account_id_mksql_fk` FOREIGN KEY (`account`) REFERENCES `accounts` (`id`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_0900_ai_ci";

#[test]
fn mysql_fresh_plan_matches_fixture_and_is_idempotent() {
    let registry = shop_registry();
    let accounts = registry.table("accounts").unwrap();
    let sessions = registry.table("sessions").unwrap();

    let fresh = plan_table(Dialect::MySql, accounts, &TableDescription::absent()).unwrap();
    let sql: Vec<&str> = fresh.iter().map(|q| q.sql.as_str()).collect();
    assert_eq!(
        sql,
        vec![
            "CREATE TABLE accounts (id int NOT NULL AUTO_INCREMENT PRIMARY KEY) COMMENT 'registered users'",
            "ALTER TABLE accounts ADD login varchar(60) NOT NULL",
            "CREATE UNIQUE INDEX accounts_login_mksql_uindex ON accounts(login)",
            "ALTER TABLE accounts ADD role varchar(20) DEFAULT 'guest' NULL COMMENT 'user''s role'",
            "ALTER TABLE accounts ADD score decimal(10,2) DEFAULT '0' NOT NULL",
            "ALTER TABLE accounts ADD active bool DEFAULT '1' NOT NULL",
        ]
    );

    let described = parse_show_create_table(MYSQL_ACCOUNTS, accounts);
    assert!(plan_table(Dialect::MySql, accounts, &described)
        .unwrap()
        .is_empty());

    let described = parse_show_create_table(MYSQL_SESSIONS, sessions);
    assert!(plan_table(Dialect::MySql, sessions, &described)
        .unwrap()
        .is_empty());
}

#[test]
fn mysql_foreign_key_change_drops_before_modify() {
    let mut registry = shop_registry();
    registry.register_table("teams").unwrap();
    {
        let mut sessions = registry.table_mut("sessions").unwrap();
        let account = sessions.column_mut("account").unwrap();
        account.remove_foreign_key("accounts.id");
        account.add_foreign_key("teams.id").unwrap();
        account.set_type("bigint").unwrap();
    }
    let sessions = registry.table("sessions").unwrap();
    let described = parse_show_create_table(MYSQL_SESSIONS, sessions);

    let queries = plan_table(Dialect::MySql, sessions, &described).unwrap();
    let kinds: Vec<QueryKind> = queries.iter().map(|q| q.kind).collect();
    assert_eq!(
        kinds,
        vec![
            QueryKind::DropForeignKey,
            QueryKind::AlterColumn,
            QueryKind::CreateForeignKey,
        ]
    );
    assert_eq!(
        queries[0].sql,
        "ALTER TABLE sessions DROP FOREIGN KEY sessions_accounts_account_id_mksql_fk"
    );
    assert_eq!(
        queries[2].sql,
        "ALTER TABLE sessions ADD CONSTRAINT sessions_teams_account_id_mksql_fk FOREIGN KEY(account) REFERENCES teams(id)"
    );
}

#[test]
fn mysql_unique_flag_removed_drops_index() {
    let mut registry = shop_registry();
    registry
        .table_mut("accounts")
        .unwrap()
        .column_mut("login")
        .unwrap()
        .set_unique(false);
    let accounts = registry.table("accounts").unwrap();
    let described = parse_show_create_table(MYSQL_ACCOUNTS, accounts);

    let queries = plan_table(Dialect::MySql, accounts, &described).unwrap();
    assert_eq!(queries.len(), 1);
    assert_eq!(
        queries[0].sql,
        "DROP INDEX accounts_login_mksql_uindex ON accounts"
    );
}

#[test]
fn absent_columns_are_created_before_their_constraints() {
    let mut registry = shop_registry();
    registry
        .table_mut("sessions")
        .unwrap()
        .create_column("token", "varchar(64)")
        .unwrap()
        .set_unique(true)
        .add_foreign_key("accounts.login")
        .unwrap();

    for dialect in [Dialect::MySql, Dialect::Sqlite] {
        for name in dependency_order(&registry).unwrap() {
            let table = registry.table(&name).unwrap();
            let queries = plan_table(dialect, table, &TableDescription::absent()).unwrap();
            assert_eq!(queries[0].kind, QueryKind::CreateTable);
            for column in table.columns() {
                let created = queries
                    .iter()
                    .position(|q| {
                        q.column.as_deref() == Some(column.name())
                            && matches!(q.kind, QueryKind::AddColumn | QueryKind::RebuildCreate)
                    })
                    .unwrap_or_else(|| panic!("{dialect}: {name}.{} never created", column.name()));
                let constrained = queries.iter().position(|q| {
                    q.column.as_deref() == Some(column.name())
                        && matches!(
                            q.kind,
                            QueryKind::CreateForeignKey | QueryKind::CreateUniqueIndex
                        )
                });
                if let Some(constrained) = constrained {
                    assert!(created < constrained, "{dialect}: {name}.{}", column.name());
                }
            }
        }
    }
}

fn sqlite_rows(create: &str, indexes: &[(&str, &str)]) -> Vec<MasterRow> {
    let mut rows = vec![MasterRow::new("table", "accounts", Some(create))];
    for (name, sql) in indexes {
        rows.push(MasterRow::new("index", name, Some(sql)));
    }
    rows
}

#[test]
fn sqlite_altered_column_rebuilds_and_recreates_every_unique_index() {
    let mut registry = SchemaRegistry::new();
    let mut accounts = registry.register_table("accounts").unwrap();
    accounts
        .create_column("login", "varchar(60)")
        .unwrap()
        .set_unique(true);
    accounts
        .create_column("email", "varchar(120)")
        .unwrap()
        .set_unique(true);
    accounts.create_column("bio", "varchar(500)").unwrap();

    let rows = sqlite_rows(
        "CREATE TABLE \"accounts\" (id integer constraint accounts_pk primary key autoincrement, \
         login varchar(60) DEFAULT '' NOT NULL, email varchar(120) DEFAULT '' NOT NULL, \
         bio varchar(200) NULL)",
        &[
            (
                "accounts_login_mksql_uindex",
                "CREATE UNIQUE INDEX accounts_login_mksql_uindex ON accounts (login)",
            ),
            (
                "accounts_email_mksql_uindex",
                "CREATE UNIQUE INDEX accounts_email_mksql_uindex ON accounts (email)",
            ),
        ],
    );
    let accounts = registry.table("accounts").unwrap();
    let described = parse_sqlite_master(&rows, accounts, &registry);
    let queries = plan_table(Dialect::Sqlite, accounts, &described).unwrap();

    let kinds: Vec<QueryKind> = queries.iter().map(|q| q.kind).collect();
    assert_eq!(
        kinds,
        vec![
            QueryKind::DisableForeignKeys,
            QueryKind::RebuildCreate,
            QueryKind::RebuildCopy,
            QueryKind::RebuildDrop,
            QueryKind::RebuildRename,
            QueryKind::EnableForeignKeys,
            QueryKind::CreateUniqueIndex,
            QueryKind::CreateUniqueIndex,
        ]
    );
    assert_eq!(queries[0].sql, "PRAGMA foreign_keys=OFF");
    assert!(queries[1].sql.starts_with("CREATE TABLE accounts_mksql_tmp ("));
    assert!(queries[2].sql.starts_with("INSERT INTO accounts_mksql_tmp"));
    assert!(queries[2].sql.ends_with("SELECT id, login, email, bio FROM accounts"));
    assert_eq!(queries[3].sql, "DROP TABLE accounts");
    assert_eq!(queries[4].sql, "ALTER TABLE accounts_mksql_tmp RENAME TO accounts");
    assert_eq!(queries[5].sql, "PRAGMA foreign_keys=ON");
    assert!(queries[6].sql.contains("accounts_login_mksql_uindex"));
    assert!(queries[7].sql.contains("accounts_email_mksql_uindex"));
}

#[test]
fn sqlite_matching_table_plans_nothing() {
    let mut registry = SchemaRegistry::new();
    registry
        .register_table("accounts")
        .unwrap()
        .create_column("login", "varchar(60)")
        .unwrap()
        .set_unique(true);
    let rows = sqlite_rows(
        "CREATE TABLE accounts (id integer constraint accounts_pk primary key autoincrement, login varchar(60) DEFAULT '' NOT NULL)",
        &[(
            "accounts_login_mksql_uindex",
            "CREATE UNIQUE INDEX accounts_login_mksql_uindex ON accounts (login)",
        )],
    );
    let accounts = registry.table("accounts").unwrap();
    let described = parse_sqlite_master(&rows, accounts, &registry);
    assert!(plan_table(Dialect::Sqlite, accounts, &described)
        .unwrap()
        .is_empty());
}
