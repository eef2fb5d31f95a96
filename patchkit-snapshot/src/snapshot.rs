use std::fmt;
use std::ops::{Deref, DerefMut};

use patchkit_sql::{Key, Record, Value};

use crate::error::Lifecycle;
use crate::generation::{Generation, HookContext};

/// A lifecycle hook. It may change the row before it is written.
pub type Hook<T> = fn(&mut T, &HookContext) -> anyhow::Result<()>;

/// Hooks registered by a snapshot.
pub struct Hooks<T> {
    on_create: Option<Hook<T>>,
    on_update: Option<Hook<T>>,
    on_delete: Option<Hook<T>>,
}

impl<T> Hooks<T> {
    pub fn new() -> Self {
        Self {
            on_create: None,
            on_update: None,
            on_delete: None,
        }
    }

    pub fn on_create(mut self, hook: Hook<T>) -> Self {
        self.on_create = Some(hook);
        self
    }

    pub fn on_update(mut self, hook: Hook<T>) -> Self {
        self.on_update = Some(hook);
        self
    }

    pub fn on_delete(mut self, hook: Hook<T>) -> Self {
        self.on_delete = Some(hook);
        self
    }

    pub fn get(&self, event: Lifecycle) -> Option<Hook<T>> {
        match event {
            Lifecycle::OnCreate => self.on_create,
            Lifecycle::OnUpdate => self.on_update,
            Lifecycle::OnDelete => self.on_delete,
        }
    }
}

impl<T> Default for Hooks<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A frozen view of a table, declared inside a patch.
///
/// Only the declared columns are read and written; the primary key and the
/// audit references are handled by the session according to the
/// generation. Use [`snapshot!`](crate::snapshot!) rather than implementing
/// this by hand.
pub trait Snapshot: Sized + Send + Sync + 'static {
    type Generation: Generation;

    const TABLE: &'static str;

    /// Declared columns, without `id` and audit references.
    const COLUMNS: &'static [&'static str];

    fn decode(record: &Record) -> patchkit_sql::Result<Self>;

    fn encode(&self) -> Vec<(&'static str, Value)>;

    fn hooks() -> Hooks<Self> {
        Hooks::new()
    }
}

/// Primary key type of a snapshot.
pub type IdOf<T> = <<T as Snapshot>::Generation as Generation>::Id;

/// A snapshot row together with its primary key.
pub struct Loaded<T: Snapshot> {
    id: IdOf<T>,
    value: T,
}

impl<T: Snapshot> Loaded<T> {
    pub(crate) fn new(id: IdOf<T>, value: T) -> Self {
        Self { id, value }
    }

    pub fn id(&self) -> IdOf<T> {
        self.id
    }

    pub fn key(&self) -> Key {
        self.id.into()
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T: Snapshot> Deref for Loaded<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T: Snapshot> DerefMut for Loaded<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.value
    }
}

impl<T: Snapshot + fmt::Debug> fmt::Debug for Loaded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loaded")
            .field("id", &self.id)
            .field("value", &self.value)
            .finish()
    }
}

impl<T: Snapshot + Clone> Clone for Loaded<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: self.value.clone(),
        }
    }
}

/// Declares a snapshot struct frozen to a generation.
///
/// ```
/// use patchkit_snapshot::{snapshot, v1::V1, HookContext};
///
/// snapshot! {
///     #[derive(Debug, Clone)]
///     pub struct Sellable: V1 => "sellable" {
///         pub description: Option<String>,
///         pub image_id: Option<i64>,
///     }
///     hooks {
///         on_update => touch,
///     }
/// }
///
/// fn touch(row: &mut Sellable, _ctx: &HookContext) -> anyhow::Result<()> {
///     row.description.get_or_insert_with(String::new);
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! snapshot {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident : $generation:path => $table:literal {
            $( $(#[$field_meta:meta])* $field_vis:vis $field:ident : $ty:ty ),* $(,)?
        }
        $( hooks { $( $event:ident => $hook:expr ),* $(,)? } )?
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $(#[$field_meta])* $field_vis $field: $ty ),*
        }

        impl $crate::Snapshot for $name {
            type Generation = $generation;

            const TABLE: &'static str = $table;
            const COLUMNS: &'static [&'static str] = &[$( stringify!($field) ),*];

            fn decode(record: &$crate::Record) -> $crate::SqlResult<Self> {
                ::std::result::Result::Ok(Self {
                    $( $field: record.get(stringify!($field))? ),*
                })
            }

            fn encode(&self) -> ::std::vec::Vec<(&'static str, $crate::Value)> {
                ::std::vec![
                    $( (stringify!($field), $crate::Value::from(::std::clone::Clone::clone(&self.$field))) ),*
                ]
            }

            fn hooks() -> $crate::Hooks<Self> {
                $crate::Hooks::new() $( $( .$event($hook) )* )?
            }
        }
    };
}
