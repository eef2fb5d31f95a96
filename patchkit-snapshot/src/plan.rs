use patchkit_sql::{Key, Value};

pub(crate) type Columns = Vec<(&'static str, Value)>;

/// Pending change of one tracked row, with its audit bookkeeping resolved.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Change {
    Create {
        table: &'static str,
        row: Columns,
        audits: Vec<Columns>,
    },
    Update {
        table: &'static str,
        key: Key,
        changed: Columns,
        refresh: Option<(Key, Columns)>,
    },
    Delete {
        table: &'static str,
        key: Key,
        audits: Vec<Key>,
    },
}

/// One statement of a flush.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Step {
    InsertAudit(Columns),
    InsertRow {
        table: &'static str,
        values: Columns,
    },
    UpdateRow {
        table: &'static str,
        key: Key,
        values: Columns,
    },
    RefreshAudit {
        id: Key,
        values: Columns,
    },
    DeleteRow {
        table: &'static str,
        key: Key,
    },
    DeleteAudit(Key),
}

/// Expands the changes of a flush into statements, keeping the order the
/// changes were issued in.
///
/// The audit rows of a created row are inserted right before it and the
/// audit rows of a deleted row are removed right after it.
pub(crate) fn build(changes: Vec<Change>) -> Vec<Step> {
    let mut steps = Vec::new();

    for change in changes {
        match change {
            Change::Create { table, row, audits } => {
                steps.extend(audits.into_iter().map(Step::InsertAudit));
                steps.push(Step::InsertRow { table, values: row });
            }
            Change::Update {
                table,
                key,
                changed,
                refresh,
            } => {
                steps.push(Step::UpdateRow {
                    table,
                    key,
                    values: changed,
                });

                if let Some((id, values)) = refresh {
                    steps.push(Step::RefreshAudit { id, values });
                }
            }
            Change::Delete { table, key, audits } => {
                steps.push(Step::DeleteRow { table, key });
                steps.extend(audits.into_iter().map(Step::DeleteAudit));
            }
        }
    }

    steps
}
