use argon2::{
    Argon2, PasswordVerifier,
    password_hash::{PasswordHash, PasswordHasher, SaltString, rand_core::OsRng},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;
use utoipa::ToSchema;

use crate::{Error, Result, utils::utc_now};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StudentInfo {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(FromRow)]
struct Credentials {
    id: i64,
    password: String,
}

pub async fn get_student_list(database: &SqlitePool) -> Result<Vec<StudentInfo>> {
    let students = sqlx::query_as::<_, StudentInfo>(
        "SELECT id, name, email, created_at FROM student ORDER BY id ASC",
    )
    .fetch_all(database)
    .await?;
    Ok(students)
}

pub async fn get_student_info(database: &SqlitePool, id: i64) -> Result<Option<StudentInfo>> {
    let student = sqlx::query_as::<_, StudentInfo>(
        "SELECT id, name, email, created_at FROM student WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(database)
    .await?;
    Ok(student)
}

pub async fn create_student(
    database: &SqlitePool,
    name: String,
    email: String,
    password: String,
) -> Result<i64> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Password(e.to_string()))?
        .to_string();
    let student = sqlx::query("INSERT INTO student (name, email, password, created_at) VALUES (?, ?, ?, ?)")
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(utc_now())
        .execute(database)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Error::BadRequest("Email already registered".to_string())
            }
            e => Error::Database(e),
        })?;
    Ok(student.last_insert_rowid())
}

pub async fn delete_student(database: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM student WHERE id = ?")
        .bind(id)
        .execute(database)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Check an e-mail/password pair. Unknown e-mail and wrong password fail the same way.
pub async fn login(database: &SqlitePool, email: &str, password: &str) -> Result<StudentInfo> {
    let Some(student) =
        sqlx::query_as::<_, Credentials>("SELECT id, password FROM student WHERE email = ?")
            .bind(email)
            .fetch_optional(database)
            .await?
    else {
        return Err(Error::InvalidCredentials);
    };
    let parsed_hash =
        PasswordHash::new(&student.password).map_err(|e| Error::Password(e.to_string()))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| Error::InvalidCredentials)?;
    get_student_info(database, student.id)
        .await?
        .ok_or(Error::InvalidCredentials)
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: i64,
    exp: i64,
}

/// Bearer token handed out on login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: i64,
}

/// HS256 signing keys for access tokens.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: time::Duration,
}

impl TokenKeys {
    pub fn new(secret: &[u8], ttl: time::Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn issue(&self, student_id: i64) -> Result<AccessToken> {
        let exp = (utc_now() + self.ttl).unix_timestamp();
        let claims = Claims {
            sub: student_id,
            exp,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        Ok(AccessToken {
            access_token: token,
            token_type: "bearer".to_string(),
            expires_at: exp,
        })
    }

    pub fn verify(&self, token: &str) -> Result<i64> {
        let claims = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| Error::InvalidToken)?
            .claims;
        Ok(claims.sub)
    }
}
