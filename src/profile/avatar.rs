//! The avatar image upload route.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use axum::{
    Extension, Json,
    extract::{FromRef, Multipart, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{Error, app_state::AppState, auth::UserID};

use super::core::set_avatar_url;

/// The extensions an avatar may be stored under, one per accepted image
/// type.
const AVATAR_EXTENSIONS: [&str; 3] = ["png", "jpg", "webp"];

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// The state needed to store avatar uploads.
#[derive(Clone)]
pub struct AvatarState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The directory avatar images are written under, one subdirectory per
    /// user.
    pub avatar_dir: PathBuf,
}

impl FromRef<AppState> for AvatarState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            avatar_dir: state.avatar_dir.clone(),
        }
    }
}

/// A route handler that stores an uploaded avatar image and records its URL
/// on the user's profile.
///
/// Expects a multipart form with a single file field. The image lands at
/// `{avatar_dir}/{user_id}/avatar.{ext}` and replaces any previous avatar,
/// including one stored under a different extension.
///
/// # Errors
///
/// Returns an error response if the form has no file, the file is not a
/// PNG, JPEG or WebP image, or the file cannot be written.
pub async fn upload_avatar(
    State(state): State<AvatarState>,
    Extension(user_id): Extension<UserID>,
    mut multipart: Multipart,
) -> Result<Response, Error> {
    let field = multipart
        .next_field()
        .await
        .map_err(|error| Error::MultipartError(error.to_string()))?
        .ok_or_else(|| Error::MultipartError("the form contained no file".to_owned()))?;

    let extension = field
        .content_type()
        .and_then(extension_for)
        .ok_or(Error::NotAnImage)?;

    let data = field
        .bytes()
        .await
        .map_err(|error| Error::MultipartError(error.to_string()))?;

    let user_dir = state.avatar_dir.join(user_id.to_string());
    tokio::fs::create_dir_all(&user_dir)
        .await
        .map_err(|error| Error::FileStorageError(error.to_string()))?;

    tokio::fs::write(user_dir.join(format!("avatar.{extension}")), &data)
        .await
        .map_err(|error| Error::FileStorageError(error.to_string()))?;

    // An avatar uploaded under another extension would otherwise shadow or
    // outlive this one.
    for stale_extension in AVATAR_EXTENSIONS {
        if stale_extension != extension {
            let _ = tokio::fs::remove_file(user_dir.join(format!("avatar.{stale_extension}"))).await;
        }
    }

    let avatar_url = format!("/avatars/{user_id}/avatar.{extension}");

    let profile = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        set_avatar_url(user_id, &avatar_url, &connection)?
    };

    Ok(Json(profile).into_response())
}

#[cfg(test)]
mod avatar_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, Router, http::StatusCode, routing::post};
    use axum_test::{
        TestServer,
        multipart::{MultipartForm, Part},
    };
    use rusqlite::Connection;
    use tempfile::TempDir;

    use crate::{
        auth::{PasswordHash, UserID, create_user},
        db::initialize,
        profile::{Profile, create_profile},
    };

    use super::{AvatarState, upload_avatar};

    fn new_test_server() -> (TestServer, TempDir, UserID) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user = create_user(
            "test@example.com",
            None,
            PasswordHash::new_unchecked("hash"),
            &connection,
        )
        .unwrap();
        create_profile(user.id, &connection).unwrap();

        let avatar_dir = TempDir::new().unwrap();

        let router = Router::new()
            .route("/profile/avatar", post(upload_avatar))
            .layer(Extension(user.id))
            .with_state(AvatarState {
                db_connection: Arc::new(Mutex::new(connection)),
                avatar_dir: avatar_dir.path().to_path_buf(),
            });

        (TestServer::new(router).unwrap(), avatar_dir, user.id)
    }

    fn image_form(content_type: &str, bytes: &'static [u8]) -> MultipartForm {
        MultipartForm::new().add_part(
            "avatar",
            Part::bytes(bytes)
                .file_name("avatar.png")
                .mime_type(content_type),
        )
    }

    #[tokio::test]
    async fn upload_stores_the_image_and_updates_the_profile() {
        let (server, avatar_dir, user_id) = new_test_server();

        let response = server
            .post("/profile/avatar")
            .multipart(image_form("image/png", b"not really a png"))
            .await;

        response.assert_status_ok();
        let profile: Profile = response.json();
        assert_eq!(
            profile.avatar_url,
            Some(format!("/avatars/{user_id}/avatar.png"))
        );

        let stored_path = avatar_dir
            .path()
            .join(user_id.to_string())
            .join("avatar.png");
        let stored = std::fs::read(stored_path).unwrap();
        assert_eq!(stored, b"not really a png");
    }

    #[tokio::test]
    async fn upload_rejects_non_image_files() {
        let (server, ..) = new_test_server();

        let response = server
            .post("/profile/avatar")
            .multipart(image_form("text/plain", b"hello"))
            .await;

        response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn new_upload_replaces_avatar_stored_under_another_extension() {
        let (server, avatar_dir, user_id) = new_test_server();

        server
            .post("/profile/avatar")
            .multipart(image_form("image/png", b"png bytes"))
            .await
            .assert_status_ok();
        let response = server
            .post("/profile/avatar")
            .multipart(image_form("image/jpeg", b"jpeg bytes"))
            .await;

        response.assert_status_ok();
        let profile: Profile = response.json();
        assert_eq!(
            profile.avatar_url,
            Some(format!("/avatars/{user_id}/avatar.jpg"))
        );

        let user_dir = avatar_dir.path().join(user_id.to_string());
        assert!(user_dir.join("avatar.jpg").exists());
        assert!(!user_dir.join("avatar.png").exists());
    }
}
