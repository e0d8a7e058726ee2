//! Error types for HotFix
//!
//! 모든 에러를 중앙에서 관리

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// HotFix 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 디렉토리 관련 (init 에 치명적)
    // ========================================================================
    #[error("Failed to create patch directory {path}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Patch directory path is occupied by a non-directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Patch directory error: {0}")]
    Directory(String),

    // ========================================================================
    // 패치 관련
    // ========================================================================
    #[error("Patch not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to parse patch {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Failed to apply patch {archive}: {message}")]
    Apply { archive: PathBuf, message: String },

    #[error("Purge left {} file(s) behind: {failed:?}", .failed.len())]
    Purge { failed: Vec<PathBuf> },

    // ========================================================================
    // 영속화 / 설정
    // ========================================================================
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// 호출자에게 반드시 전달되어야 하는 에러인지 확인
    ///
    /// 파싱/적용 에러는 로컬에서 로그 후 건너뛴다.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::DirectoryCreate { .. }
                | Error::NotADirectory(_)
                | Error::Directory(_)
                | Error::Persistence(_)
                | Error::Purge { .. }
        )
    }

    /// 파싱 에러 생성 헬퍼
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// 적용 에러 생성 헬퍼
    pub fn apply(archive: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Apply {
            archive: archive.into(),
            message: message.into(),
        }
    }
}
