//! Common imports for comment-sheet users
//!
//! ```rust
//! use comment_sheet::prelude::*;
//! ```

pub use crate::{
    // Sheet and editing
    BatchOutcome,
    CancelToken,
    CellAddress,
    CellError,
    CellFormat,
    CellRange,
    CellSnapshot,
    ClipboardProvider,
    Color,
    EditSession,
    EditState,
    // Errors
    Error,
    FillDirection,
    FontAttribute,
    FontChange,
    FontStyle,
    MemoryClipboard,
    ProgressSink,
    // Persistence
    ProjectFile,
    Result,
    Sheet,
    SheetConfig,
    SheetDocument,
    // Notifications
    SheetEvent,
    SheetObserver,
};
