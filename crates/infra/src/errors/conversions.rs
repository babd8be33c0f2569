//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;
use skilltrail_domain::SkillTrailError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub SkillTrailError);

impl From<InfraError> for SkillTrailError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<SkillTrailError> for InfraError {
    fn from(value: SkillTrailError) -> Self {
        InfraError(value)
    }
}

trait IntoSkillTrailError {
    fn into_skilltrail(self) -> SkillTrailError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → SkillTrailError */
/* -------------------------------------------------------------------------- */

impl IntoSkillTrailError for SqlError {
    fn into_skilltrail(self) -> SkillTrailError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        SkillTrailError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        SkillTrailError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067 | 1555) => {
                        SkillTrailError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        SkillTrailError::Database("foreign key constraint violation".into())
                    }
                    _ => SkillTrailError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => {
                SkillTrailError::NotFound("no rows returned by query".into())
            }
            RE::FromSqlConversionFailure(_, _, cause) => {
                SkillTrailError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                SkillTrailError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => {
                SkillTrailError::Database("invalid UTF-8 returned from sqlite".into())
            }
            RE::InvalidPath(path) => SkillTrailError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => SkillTrailError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_skilltrail())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → SkillTrailError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(SkillTrailError::Database(format!("connection pool error: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → SkillTrailError */
/* -------------------------------------------------------------------------- */

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(SkillTrailError::Database(format!("invalid stored JSON: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → SkillTrailError */
/* -------------------------------------------------------------------------- */

impl IntoSkillTrailError for HttpError {
    fn into_skilltrail(self) -> SkillTrailError {
        if self.is_timeout() {
            return SkillTrailError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return SkillTrailError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => SkillTrailError::Config(format!("{message}: check llm.api_key")),
                404 => SkillTrailError::NotFound(message),
                400..=499 if code != 429 => SkillTrailError::InvalidInput(message),
                _ => SkillTrailError::Network(message),
            };
        }

        SkillTrailError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_skilltrail())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
