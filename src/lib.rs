pub mod core;

pub use crate::core::RequirementsAssist;
pub use crate::core::export::{
    BoardBackup, LinkRow, ProjectRow, flatten_links, flatten_projects, parse_backup,
};
pub use crate::core::store::{
    ApiKey, BlobStore, BoardData, BoardStore, Course, CourseUpdate, KvEvent, KvStore, Link,
    LinkRef, LinkUpdate, NewCourse, NewLink, NewProject, Note, Project, ProjectStatus,
    ProjectUpdate, Requirements, Settings, SettingsUpdate, StoreConfig, StoreMode,
};
