use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use tokio::sync::watch;

use crate::client::{ClientError, CollectionSource, HttpCollection, InMemoryCollection};
use crate::controller::{ListController, ListError, ListView, NoticeKind, Phase};
use crate::filter::FilterPatch;
use crate::records::{Draft, RecordId, User, UserDraft, Vacancy, VacancyDraft};

fn user_rows(n: i64) -> Vec<JsonValue> {
    (1..=n)
        .map(|i| {
            json!({
                "user_id": i,
                "name": format!("User {i}"),
                "email": format!("user{i}@talent.io"),
                "role_id": if i % 3 == 0 { 1 } else { 2 },
                "password": "Stored-pass1"
            })
        })
        .collect()
}

fn vacancy_rows() -> Vec<JsonValue> {
    vec![
        json!({"vacancy_id": 1, "title": "Backend Developer", "location": "Madrid", "status": "open"}),
        json!({"vacancy_id": 2, "title": "Frontend Developer", "location": "Remote", "status": "closed"}),
        json!({"vacancy_id": 3, "title": "Data Engineer", "location": "Madrid", "status": "open"}),
    ]
}

async fn loaded_users(n: i64, page_size: usize) -> ListController<User, InMemoryCollection<User>> {
    let mut ctl = ListController::new(InMemoryCollection::with_rows(user_rows(n)), page_size);
    ctl.load().await.unwrap();
    ctl
}

fn valid_user_draft() -> UserDraft {
    UserDraft {
        name: "Nina Park".to_string(),
        email: "nina@talent.io".to_string(),
        password: "Secr3t!".to_string(),
        role_id: 2,
    }
}

#[tokio::test]
async fn requested_page_is_clamped_to_last_page() {
    let mut ctl = loaded_users(18, 8).await;
    ctl.set_page(9);
    let view = ctl.view();
    assert_eq!(view.window.page, 3);
    assert_eq!(view.visible.len(), 2);
    assert_eq!(view.window.label(), "3 of 3");
    assert_eq!(view.visible[0].user_id, 17);

    ctl.set_page(0);
    assert_eq!(ctl.page(), 1);
}

#[tokio::test]
async fn filtering_resets_to_first_page_and_survives_reload() {
    let mut ctl = loaded_users(18, 8).await;
    ctl.set_page(3);
    ctl.set_filter(FilterPatch::search("user1"));
    assert_eq!(ctl.page(), 1);
    // user1, user10..user18
    assert_eq!(ctl.view().window.total, 10);

    ctl.set_page(2);
    ctl.load().await.unwrap();
    assert_eq!(ctl.criteria().search, "user1");
    assert_eq!(ctl.page(), 2);
    assert_eq!(ctl.view().visible.len(), 2);
}

#[tokio::test]
async fn search_and_category_combine() {
    let mut ctl = ListController::new(InMemoryCollection::<Vacancy>::with_rows(vacancy_rows()), 8);
    ctl.load().await.unwrap();
    ctl.set_filter(FilterPatch::search("developer"));
    ctl.set_filter(FilterPatch::category("open"));
    let view = ctl.view();
    assert_eq!(view.visible.len(), 1);
    assert_eq!(view.visible[0].title, "Backend Developer");

    ctl.set_filter(FilterPatch::search(""));
    assert_eq!(ctl.view().visible.len(), 2);

    ctl.clear_filters();
    assert_eq!(ctl.view().visible.len(), 3);
    assert!(!ctl.criteria().is_active());
}

#[tokio::test]
async fn no_match_gives_empty_window() {
    let mut ctl = loaded_users(5, 8).await;
    ctl.set_filter(FilterPatch::search("nobody"));
    let view = ctl.view();
    assert!(view.visible.is_empty());
    assert_eq!(view.window.label(), "0 of 0");
    assert_eq!(view.window.page, 1);
}

#[tokio::test]
async fn invalid_form_never_reaches_the_server() {
    let mut ctl = loaded_users(2, 8).await;
    ctl.begin_create();
    let draft = UserDraft {
        name: String::new(),
        ..valid_user_draft()
    };
    let err = ctl.submit(draft.clone()).await.unwrap_err();
    assert!(matches!(err, ListError::Validation(_)));
    assert_eq!(ctl.source().calls(), vec!["list"]);

    let notice = ctl.notice().unwrap();
    assert_eq!(notice.kind, NoticeKind::Error);
    assert_eq!(notice.text, "Please fill in all required fields.");
    assert_eq!(ctl.phase(), Phase::Editing);
    assert_eq!(ctl.form(), Some(&draft));
}

#[tokio::test]
async fn create_reloads_and_closes_the_form() {
    let mut ctl = loaded_users(2, 8).await;
    ctl.begin_create();
    ctl.submit(valid_user_draft()).await.unwrap();

    assert_eq!(ctl.source().calls(), vec!["list", "create", "list"]);
    assert_eq!(ctl.records().len(), 3);
    assert!(ctl.records().iter().any(|u| u.email == "nina@talent.io"));
    assert_eq!(ctl.notice().unwrap().text, "User created successfully!");
    assert_eq!(ctl.phase(), Phase::Idle);
    assert!(ctl.form().is_none());
    assert!(ctl.edit_target().is_none());
}

#[tokio::test]
async fn failed_save_keeps_form_and_target() {
    let mut ctl = loaded_users(4, 8).await;
    assert!(ctl.begin_edit(4));
    let mut draft = ctl.form().cloned().unwrap();
    draft.name = "Renamed".to_string();

    ctl.source().fail_next(ClientError::Transport {
        status: Some(500),
        message: "boom".to_string(),
    });
    let err = ctl.submit(draft.clone()).await.unwrap_err();
    assert!(matches!(err, ListError::Remote(ClientError::Transport { .. })));

    assert_eq!(ctl.edit_target(), Some(4));
    assert_eq!(ctl.form(), Some(&draft));
    assert_eq!(
        ctl.notice().unwrap().text,
        "An error occurred while saving the user. (HTTP 500)"
    );
    assert_eq!(ctl.records()[3].name, "User 4");
}

#[tokio::test]
async fn server_validation_message_is_shown_verbatim() {
    let mut ctl = loaded_users(1, 8).await;
    ctl.begin_create();
    ctl.source().fail_next(ClientError::Validation {
        status: 409,
        message: "Email already registered".to_string(),
    });
    assert!(ctl.submit(valid_user_draft()).await.is_err());
    assert_eq!(ctl.notice().unwrap().text, "Email already registered");
}

#[tokio::test]
async fn update_without_password_keeps_the_stored_one() {
    let mut ctl = loaded_users(3, 8).await;
    assert!(ctl.begin_edit(2));
    let mut draft = ctl.form().cloned().unwrap();
    assert!(draft.password.is_empty());
    draft.name = "Second User".to_string();
    ctl.submit(draft).await.unwrap();

    let raw = ctl.source().raw(2).unwrap();
    assert_eq!(raw["password"], "Stored-pass1");
    assert_eq!(raw["name"], "Second User");
    assert_eq!(ctl.notice().unwrap().text, "User updated successfully!");
}

#[tokio::test]
async fn edit_of_uncached_id_is_ignored() {
    let mut ctl = loaded_users(3, 8).await;
    assert!(!ctl.begin_edit(99));
    assert_eq!(ctl.phase(), Phase::Idle);
    assert!(ctl.form().is_none());
    assert!(ctl.edit_target().is_none());
}

#[tokio::test]
async fn cancel_edit_discards_the_form() {
    let mut ctl = loaded_users(3, 8).await;
    ctl.begin_edit(1);
    ctl.cancel_edit();
    assert_eq!(ctl.phase(), Phase::Idle);
    assert!(ctl.form().is_none());
    assert!(ctl.edit_target().is_none());
}

#[tokio::test]
async fn record_deleted_elsewhere_is_reported_and_cache_caught_up() {
    let mut ctl = loaded_users(4, 8).await;
    ctl.begin_edit(4);
    let draft = ctl.form().cloned().unwrap();
    ctl.source().delete_behind(4);

    let err = ctl.submit(draft).await.unwrap_err();
    assert_eq!(err, ListError::Remote(ClientError::NotFound { id: 4 }));
    assert_eq!(ctl.notice().unwrap().text, "User 4 no longer exists.");
    assert!(ctl.records().iter().all(|u| u.user_id != 4));
    assert_eq!(ctl.source().calls(), vec!["list", "update:4", "list"]);
}

#[tokio::test]
async fn failed_delete_keeps_target_until_cancelled() {
    let mut ctl = loaded_users(4, 8).await;
    ctl.begin_delete(2);
    ctl.source().fail_next(ClientError::transport("connection reset"));
    assert!(ctl.confirm_delete().await.is_err());

    assert_eq!(ctl.delete_target(), Some(2));
    assert_eq!(ctl.phase(), Phase::ConfirmingDelete);
    assert_eq!(ctl.notice().unwrap().text, "Failed to delete user.");
    assert_eq!(ctl.records().len(), 4);

    ctl.cancel_delete();
    assert!(ctl.delete_target().is_none());
    assert_eq!(ctl.phase(), Phase::Idle);
}

#[tokio::test]
async fn delete_of_missing_record_keeps_target_and_reloads() {
    let mut ctl = loaded_users(4, 8).await;
    ctl.begin_delete(3);
    ctl.source().delete_behind(3);
    let err = ctl.confirm_delete().await.unwrap_err();
    assert_eq!(err, ListError::Remote(ClientError::NotFound { id: 3 }));
    assert_eq!(ctl.delete_target(), Some(3));
    assert_eq!(ctl.records().len(), 3);
    assert_eq!(ctl.notice().unwrap().text, "User 3 no longer exists.");
}

#[tokio::test]
async fn deleting_the_last_row_of_a_page_moves_back() {
    let mut ctl = loaded_users(9, 8).await;
    ctl.set_page(2);
    assert_eq!(ctl.view().visible.len(), 1);

    ctl.begin_delete(9);
    ctl.confirm_delete().await.unwrap();
    assert_eq!(ctl.page(), 1);
    assert_eq!(ctl.view().visible.len(), 8);
    assert_eq!(ctl.notice().unwrap().text, "User deleted successfully.");
    assert!(ctl.delete_target().is_none());
}

#[tokio::test]
async fn confirm_without_target_does_nothing() {
    let mut ctl = loaded_users(2, 8).await;
    ctl.confirm_delete().await.unwrap();
    assert_eq!(ctl.source().calls(), vec!["list"]);
}

#[tokio::test]
async fn failed_load_keeps_stale_records() {
    let mut ctl = loaded_users(5, 8).await;
    ctl.source().fail_next(ClientError::transport("offline"));
    assert!(ctl.load().await.is_err());

    assert_eq!(ctl.phase(), Phase::Error);
    assert_eq!(ctl.records().len(), 5);
    assert_eq!(
        ctl.notice().unwrap().text,
        "Error loading page data. Please check the server connection."
    );

    ctl.load().await.unwrap();
    assert_eq!(ctl.phase(), Phase::Idle);
}

#[tokio::test]
async fn recovery_after_failed_refresh_restores_open_form() {
    let mut ctl = loaded_users(3, 8).await;
    assert!(ctl.begin_edit(1));
    ctl.source().fail_next(ClientError::transport("offline"));
    assert!(ctl.load().await.is_err());
    assert_eq!(ctl.phase(), Phase::Error);

    ctl.load().await.unwrap();
    assert_eq!(ctl.phase(), Phase::Editing);
    assert_eq!(ctl.edit_target(), Some(1));
    assert!(ctl.form().is_some());
    assert_eq!(ctl.view().phase, Phase::Editing);
}

#[tokio::test]
async fn recovery_after_failed_refresh_restores_delete_prompt() {
    let mut ctl = loaded_users(3, 8).await;
    ctl.begin_delete(2);
    ctl.source().fail_next(ClientError::transport("offline"));
    assert!(ctl.load().await.is_err());

    ctl.load().await.unwrap();
    assert_eq!(ctl.phase(), Phase::ConfirmingDelete);
    assert_eq!(ctl.delete_target(), Some(2));
}

#[tokio::test]
async fn create_after_edit_drops_the_old_target() {
    let mut ctl = loaded_users(3, 8).await;
    assert!(ctl.begin_edit(2));
    ctl.begin_create();
    assert!(ctl.edit_target().is_none());
    assert_eq!(ctl.form(), Some(&UserDraft::default()));

    ctl.submit(valid_user_draft()).await.unwrap();
    assert_eq!(ctl.source().calls(), vec!["list", "create", "list"]);
    assert_eq!(ctl.records().len(), 4);
    assert_eq!(ctl.source().raw(2).unwrap()["name"], "User 2");
}

#[tokio::test]
async fn first_load_failure_leaves_an_empty_list() {
    let source = InMemoryCollection::<User>::with_rows(user_rows(3));
    source.fail_next(ClientError::Transport {
        status: Some(503),
        message: "unavailable".to_string(),
    });
    let mut ctl = ListController::new(source, 8);
    assert!(ctl.load().await.is_err());
    assert!(ctl.records().is_empty());
    assert!(ctl.view().notice.unwrap().text.ends_with("(HTTP 503)"));
}

#[tokio::test]
async fn controllers_do_not_share_state() {
    let mut users = loaded_users(10, 8).await;
    let mut vacancies =
        ListController::new(InMemoryCollection::<Vacancy>::with_rows(vacancy_rows()), 2);
    vacancies.load().await.unwrap();

    users.set_filter(FilterPatch::search("user1"));
    vacancies.set_page(2);
    assert!(vacancies.criteria().search.is_empty());
    assert_eq!(users.page(), 1);
    assert_eq!(vacancies.page(), 2);
}

#[tokio::test]
async fn category_counts_cover_the_whole_cache() {
    let mut ctl = loaded_users(9, 2).await;
    ctl.set_filter(FilterPatch::search("user9"));
    let counts = ctl.category_counts();
    assert_eq!(counts.get("1"), Some(&3));
    assert_eq!(counts.get("2"), Some(&6));
}

#[tokio::test]
async fn vacancy_title_is_validated_locally() {
    let mut ctl = ListController::new(InMemoryCollection::<Vacancy>::with_rows(vacancy_rows()), 8);
    ctl.load().await.unwrap();
    ctl.begin_create();
    let draft = VacancyDraft {
        title: "X".to_string(),
        ..VacancyDraft::default()
    };
    assert!(ctl.submit(draft).await.is_err());
    assert_eq!(
        ctl.notice().unwrap().text,
        "Title must be at least 2 characters long."
    );
    assert_eq!(ctl.source().calls(), vec!["list"]);
}

/// Records the published busy flag at the moment each write reaches the source.
struct BusyRecorder {
    inner: InMemoryCollection<User>,
    rx: Arc<Mutex<Option<watch::Receiver<ListView<User>>>>>,
    seen: Arc<Mutex<Vec<bool>>>,
}

impl BusyRecorder {
    fn record(&self) {
        let busy = self
            .rx
            .lock()
            .unwrap()
            .as_ref()
            .map(|rx| rx.borrow().busy)
            .unwrap_or(false);
        self.seen.lock().unwrap().push(busy);
    }
}

#[async_trait]
impl CollectionSource<User> for BusyRecorder {
    async fn list(&self) -> Result<Vec<User>, ClientError> {
        self.record();
        self.inner.list().await
    }

    async fn create(&self, payload: &JsonValue) -> Result<User, ClientError> {
        self.record();
        self.inner.create(payload).await
    }

    async fn update(&self, id: RecordId, payload: &JsonValue) -> Result<User, ClientError> {
        self.record();
        self.inner.update(id, payload).await
    }

    async fn remove(&self, id: RecordId) -> Result<(), ClientError> {
        self.record();
        self.inner.remove(id).await
    }
}

#[tokio::test]
async fn busy_is_published_while_a_write_is_outstanding() {
    let rx_slot = Arc::new(Mutex::new(None));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = BusyRecorder {
        inner: InMemoryCollection::with_rows(user_rows(2)),
        rx: rx_slot.clone(),
        seen: seen.clone(),
    };
    let mut ctl = ListController::new(recorder, 8);
    *rx_slot.lock().unwrap() = Some(ctl.subscribe());

    ctl.load().await.unwrap();
    ctl.begin_create();
    ctl.submit(valid_user_draft()).await.unwrap();
    ctl.begin_delete(1);
    ctl.confirm_delete().await.unwrap();

    // load, create, reload, remove, reload
    assert_eq!(*seen.lock().unwrap(), vec![false, true, false, true, false]);
    assert!(!ctl.is_busy());
    assert!(!ctl.subscribe().borrow().busy);
}

#[tokio::test]
async fn http_backed_controller_reloads_after_create() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/vacancies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vacancy_rows()))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/vacancies"))
        .respond_with(ResponseTemplate::new(201).set_body_json(
            json!({"vacancy_id": 4, "title": "QA Engineer", "status": "open"}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let source: HttpCollection<Vacancy> =
        HttpCollection::new(reqwest::Client::new(), format!("{}/api", server.uri()));
    let mut ctl = ListController::new(source, 8);
    ctl.load().await.unwrap();
    ctl.begin_create();
    let draft = VacancyDraft {
        title: "QA Engineer".to_string(),
        status: "open".to_string(),
        ..VacancyDraft::default()
    };
    ctl.submit(draft).await.unwrap();

    assert_eq!(ctl.notice().unwrap().text, "Vacancy created successfully!");

    let requests = server.received_requests().await.unwrap();
    let body: JsonValue = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(body["title"], "QA Engineer");
    assert_eq!(body["location"], JsonValue::Null);
}

#[test]
fn edit_form_starts_from_the_cached_record() {
    let user = User {
        user_id: 7,
        name: "Ana Ruiz".to_string(),
        email: "ana@talent.io".to_string(),
        role_id: 1,
    };
    let draft = UserDraft::from_record(&user);
    assert_eq!(draft.name, "Ana Ruiz");
    assert_eq!(draft.role_id, 1);
    assert!(draft.password.is_empty());
}
