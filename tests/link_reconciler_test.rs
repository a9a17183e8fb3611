// ==========================================
// LinkReconciler 集成测试
// ==========================================
// 测试范围:
// 1. 对账迁移与时间戳只设一次
// 2. 幂等重跑 (同信号零迁移)
// 3. 2→4 回退升级只作用于最新导出行
// 4. 链接等待库龄报表 (窗口/决胜/计龄起点)
// ==========================================


use bonepile_tracking::domain::export_link::ExportLinkRecord;
use bonepile_tracking::domain::fact::ExternalFactBundle;
use bonepile_tracking::domain::types::{AgingProfile, LinkState, StartTimeKind};
use bonepile_tracking::engine::LinkReconciler;
use bonepile_tracking::gateway::FactGateway;
use bonepile_tracking::repository::ExportLinkRepository;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use test_helpers::{create_test_db, MockFactSource};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
}

fn export_at(days_ago: i64) -> DateTime<Utc> {
    now() - Duration::days(days_ago)
}

struct Fixture {
    _temp: tempfile::NamedTempFile,
    reconciler: LinkReconciler,
    link_repo: Arc<ExportLinkRepository>,
}

fn setup(source: MockFactSource) -> Fixture {
    let (temp, conn) = create_test_db().expect("create test db");
    let link_repo = Arc::new(ExportLinkRepository::new(conn));
    let gateway = Arc::new(FactGateway::new(Arc::new(source)));
    let reconciler = LinkReconciler::new(link_repo.clone(), gateway);
    Fixture {
        _temp: temp,
        reconciler,
        link_repo,
    }
}

fn seed_export(fx: &Fixture, serial: &str, export_date: DateTime<Utc>) -> i64 {
    fx.link_repo
        .insert(&ExportLinkRecord::new(serial, export_date))
        .unwrap()
}

fn find_row(fx: &Fixture, serial: &str, row_id: i64) -> ExportLinkRecord {
    fx.link_repo
        .list_by_serial(serial)
        .unwrap()
        .into_iter()
        .find(|r| r.row_id == row_id)
        .expect("row present")
}

// ==========================================
// 对账迁移
// ==========================================

#[tokio::test]
async fn test_unlinked_to_linked_with_repair_confirmation() {
    let fx = setup(
        MockFactSource::new()
            .with_kanban_wip("SN001", "B36R_TO_SFG_STATION")
            .with_extended_wip("SN001", "REPAIR_B36R_DONE"),
    );
    let row_id = seed_export(&fx, "SN001", export_at(2));

    let report = fx.reconciler.reconcile(now()).await.unwrap();
    assert_eq!(report.transitioned, 1);
    assert_eq!(report.reverted, 0);

    let row = find_row(&fx, "SN001", row_id);
    assert_eq!(row.checking_b36r, LinkState::Linked);
    assert_eq!(row.link_time, Some(now()));
}

#[tokio::test]
async fn test_unlinked_to_linked_when_left_b36r() {
    // 扩展信号完全不含 B36R 同样视为已链接
    let fx = setup(
        MockFactSource::new()
            .with_kanban_wip("SN001", "B36R_TO_SFG")
            .with_extended_wip("SN001", "PACKING"),
    );
    let row_id = seed_export(&fx, "SN001", export_at(2));

    fx.reconciler.reconcile(now()).await.unwrap();
    assert_eq!(
        find_row(&fx, "SN001", row_id).checking_b36r,
        LinkState::Linked
    );
}

#[tokio::test]
async fn test_kanban_signal_observes_and_stamps_once() {
    let fx = setup(MockFactSource::new().with_kanban_wip("SN001", "KANBAN_OUT_7"));
    let row_id = seed_export(&fx, "SN001", export_at(1));

    fx.reconciler.reconcile(now()).await.unwrap();
    let row = find_row(&fx, "SN001", row_id);
    assert_eq!(row.checking_b36r, LinkState::KanbanObserved);
    assert_eq!(row.kanban_time, Some(now()));

    // 幂等重跑: 同信号第二遍零迁移, 时间戳不被覆盖
    let later = now() + Duration::hours(4);
    let report = fx.reconciler.reconcile(later).await.unwrap();
    assert_eq!(report.transitioned, 0);
    assert_eq!(report.reverted, 0);
    assert_eq!(find_row(&fx, "SN001", row_id).kanban_time, Some(now()));
}

#[tokio::test]
async fn test_timestamp_only_write_counts_as_stamp_not_transition() {
    // state=4 的行收到首个看板信号: 只补 KanbanTime, 状态不动
    let fx = setup(MockFactSource::new().with_kanban_wip("SN001", "KANBAN_IN"));
    let mut record = ExportLinkRecord::new("SN001", export_at(3));
    record.checking_b36r = LinkState::RevertedError;
    let row_id = fx.link_repo.insert(&record).unwrap();

    let report = fx.reconciler.reconcile(now()).await.unwrap();
    assert_eq!(report.transitioned, 0);
    assert_eq!(report.reverted, 0);
    assert_eq!(report.stamped, 1);

    let row = find_row(&fx, "SN001", row_id);
    assert_eq!(row.checking_b36r, LinkState::RevertedError);
    assert_eq!(row.kanban_time, Some(now()));
}

#[tokio::test]
async fn test_missing_signals_leave_record_untouched() {
    let fx = setup(MockFactSource::new());
    let row_id = seed_export(&fx, "SN001", export_at(1));

    let report = fx.reconciler.reconcile(now()).await.unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.transitioned, 0);

    let row = find_row(&fx, "SN001", row_id);
    assert_eq!(row.checking_b36r, LinkState::Unlinked);
    assert_eq!(row.revision, 0);
}

// ==========================================
// 2→4 回退升级
// ==========================================

#[tokio::test]
async fn test_linked_escalates_to_reverted_error() {
    // 场景: state=2, LinkTime 已设, 看板含 B36R_TO_SFG,
    //       扩展含 B36R 不含 REPAIR_B36R, 最新导出行 → 4
    let fx = setup(
        MockFactSource::new()
            .with_kanban_wip("SN001", "B36R_TO_SFG")
            .with_extended_wip("SN001", "B36R_HOLD"),
    );
    let mut record = ExportLinkRecord::new("SN001", export_at(3));
    record.checking_b36r = LinkState::Linked;
    record.link_time = Some(export_at(2));
    let row_id = fx.link_repo.insert(&record).unwrap();

    let report = fx.reconciler.reconcile(now()).await.unwrap();
    assert_eq!(report.reverted, 1);
    assert_eq!(
        find_row(&fx, "SN001", row_id).checking_b36r,
        LinkState::RevertedError
    );
}

#[tokio::test]
async fn test_escalation_only_touches_latest_export_row() {
    let fx = setup(
        MockFactSource::new()
            .with_kanban_wip("SN001", "B36R_TO_SFG")
            .with_extended_wip("SN001", "B36R_HOLD"),
    );
    // 旧导出行: 已链接
    let mut old = ExportLinkRecord::new("SN001", export_at(10));
    old.checking_b36r = LinkState::Linked;
    old.link_time = Some(export_at(9));
    let old_id = fx.link_repo.insert(&old).unwrap();
    // 新导出行: 已链接
    let mut newer = ExportLinkRecord::new("SN001", export_at(2));
    newer.checking_b36r = LinkState::Linked;
    newer.link_time = Some(export_at(1));
    let new_id = fx.link_repo.insert(&newer).unwrap();

    fx.reconciler.reconcile(now()).await.unwrap();

    // 旧行保留历史状态, 只有最新行被升级
    assert_eq!(find_row(&fx, "SN001", old_id).checking_b36r, LinkState::Linked);
    assert_eq!(
        find_row(&fx, "SN001", new_id).checking_b36r,
        LinkState::RevertedError
    );
}

// ==========================================
// 链接等待库龄报表
// ==========================================

#[tokio::test]
async fn test_link_aging_report_window_and_start_kind() {
    let export = export_at(5);
    let in_station = export + Duration::days(1); // 进站 ≥ 导出 → InStation

    let mut fact = ExternalFactBundle::empty("SN001");
    fact.in_station_time = Some(in_station);

    let fx = setup(MockFactSource::new().with_fact(fact));
    seed_export(&fx, "SN001", export);
    seed_export(&fx, "SN002", export_at(4)); // 无事实包 → AwaitingEntry
    seed_export(&fx, "SN003", export_at(40)); // 窗口外

    let rows = fx
        .reconciler
        .link_aging_report(export_at(30), now(), AgingProfile::ShortTerm, now())
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    // 排序: ExportDate 降序 → SN002 在前
    assert_eq!(rows[0].serial_number, "SN002");
    assert_eq!(rows[0].start_kind, StartTimeKind::AwaitingEntry);
    assert_eq!(rows[0].bucket, None);
    assert_eq!(rows[0].aging_days, 4.0);

    assert_eq!(rows[1].serial_number, "SN001");
    assert_eq!(rows[1].start_kind, StartTimeKind::InStation);
    assert_eq!(rows[1].aging_days, 4.0); // 自进站起 4 天
    assert_eq!(rows[1].bucket, Some(">3 ngày"));
}

#[tokio::test]
async fn test_link_aging_report_only_current_rows_state_1_or_2() {
    let fx = setup(MockFactSource::new());
    // 同一序列号两行: 旧行 state=2, 新行 state=1 → 只有新行(当前)入选
    let mut old = ExportLinkRecord::new("SN001", export_at(8));
    old.checking_b36r = LinkState::Linked;
    old.link_time = Some(export_at(7));
    fx.link_repo.insert(&old).unwrap();
    seed_export(&fx, "SN001", export_at(2));

    // 当前行 state=3 → 不入选
    let mut observed = ExportLinkRecord::new("SN002", export_at(2));
    observed.checking_b36r = LinkState::KanbanObserved;
    fx.link_repo.insert(&observed).unwrap();

    let rows = fx
        .reconciler
        .link_aging_report(export_at(30), now(), AgingProfile::ShortTerm, now())
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].serial_number, "SN001");
    assert_eq!(rows[0].state, LinkState::Unlinked);
}
