//! Namespace-prefixed cache key scheme.
//!
//! Every key renders as `taskhive:<namespace>:<uuid>`. The namespace prefix
//! partitions the keyspace by entity kind, so bulk enumeration and bulk
//! eviction by kind work without a separate index.

use uuid::Uuid;

/// Root prefix shared by every Taskhive cache key.
const KEY_ROOT: &str = "taskhive";

/// Entity kind a cache key belongs to.
///
/// One namespace per cached aggregate shape: the task itself plus the three
/// derived list views a task write can invalidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    /// A single task, keyed by task id.
    Task,
    /// All tasks owned by a user, keyed by user id.
    UserTasks,
    /// All tasks belonging to a team, keyed by team id.
    TeamTasks,
    /// All tasks in a project, keyed by project id.
    ProjectTasks,
}

impl CacheNamespace {
    /// Every namespace, in eviction order (task first, then list views).
    pub const ALL: [CacheNamespace; 4] = [
        CacheNamespace::Task,
        CacheNamespace::UserTasks,
        CacheNamespace::TeamTasks,
        CacheNamespace::ProjectTasks,
    ];

    /// The segment this namespace contributes to rendered keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheNamespace::Task => "task",
            CacheNamespace::UserTasks => "user_tasks",
            CacheNamespace::TeamTasks => "team_tasks",
            CacheNamespace::ProjectTasks => "project_tasks",
        }
    }

    /// Parse a namespace segment back into the enum.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "task" => Some(CacheNamespace::Task),
            "user_tasks" => Some(CacheNamespace::UserTasks),
            "team_tasks" => Some(CacheNamespace::TeamTasks),
            "project_tasks" => Some(CacheNamespace::ProjectTasks),
            _ => None,
        }
    }

    /// Key prefix for enumerating every entry in this namespace.
    pub fn prefix(&self) -> String {
        format!("{}:{}:", KEY_ROOT, self.as_str())
    }

    /// Position of this namespace in [`CacheNamespace::ALL`].
    pub fn index(&self) -> usize {
        match self {
            CacheNamespace::Task => 0,
            CacheNamespace::UserTasks => 1,
            CacheNamespace::TeamTasks => 2,
            CacheNamespace::ProjectTasks => 3,
        }
    }
}

impl std::fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A namespace-scoped cache key.
///
/// The private fields make an unprefixed or mis-prefixed key impossible to
/// construct: every key that reaches a backend went through [`CacheKey::new`]
/// and therefore carries its namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: CacheNamespace,
    id: Uuid,
}

impl CacheKey {
    /// Create a key for `id` within `namespace`.
    pub fn new(namespace: CacheNamespace, id: Uuid) -> Self {
        Self { namespace, id }
    }

    /// The namespace this key is scoped to.
    pub fn namespace(&self) -> CacheNamespace {
        self.namespace
    }

    /// The identifier portion of the key.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Render to the backend string form: `taskhive:<namespace>:<uuid>`.
    pub fn render(&self) -> String {
        format!("{}:{}:{}", KEY_ROOT, self.namespace.as_str(), self.id)
    }

    /// Parse a rendered key back into its parts.
    ///
    /// Returns `None` if:
    /// - the root prefix is missing or wrong
    /// - the namespace segment is unknown
    /// - the id segment is not a valid UUID
    /// - the segment count is wrong
    pub fn parse(rendered: &str) -> Option<Self> {
        let mut parts = rendered.splitn(3, ':');
        if parts.next()? != KEY_ROOT {
            return None;
        }
        let namespace = CacheNamespace::from_segment(parts.next()?)?;
        let id = Uuid::parse_str(parts.next()?).ok()?;
        Some(Self { namespace, id })
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}
