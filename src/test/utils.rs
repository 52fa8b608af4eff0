#[cfg(test)]
pub mod test_utils {
    use std::sync::Once;
    use std::time::Duration;

    use chrono::Utc;
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::{Value, json};
    use tracing_subscriber::EnvFilter;

    use crate::auth::Account;
    use crate::catalog::CatalogDocument;
    use crate::env::Config;
    use crate::error::AppError;
    use crate::init_rocket;
    use crate::state::AppState;
    use crate::store::{KvStore, keys};

    static INIT: Once = Once::new();
    pub static STANDARD_PASSWORD: &str = "password123";

    /// Small catalog with every join the detail view knows about, plus one
    /// nameless row and one dangling class/spell link.
    pub fn standard_catalog() -> Value {
        json!({
            "расы": [
                {"id": 1, "название": "Эльф", "описание": "Изящный долгожитель лесов", "размер": "Средний"},
                {"id": 2, "название": "Дварф", "описание": "Крепкий житель гор", "размер": "Средний"},
                {"id": 3, "описание": "Запись без названия"}
            ],
            "классы": [
                {"id": 1, "название": "Волшебник", "описание": "Изучает магию по книгам"},
                {"id": 2, "название": "Воин", "описание": "Мастер оружия"}
            ],
            "заклинания": [
                {"id": 1, "название": "Огненный шар", "уровень": 3, "школа": "Воплощение", "описание": "Взрыв пламени"},
                {"id": 2, "название": "Волшебная стрела", "уровень": 1, "школа": "Воплощение", "описание": "Три светящихся дротика"},
                {"id": 3, "название": "Заговор", "уровень": 0, "школа": "Очарование", "описание": "Простейшее волшебство"}
            ],
            "монстры": [
                {"id": 1, "название": "Гоблин", "тип": "Гуманоид", "рейтинг_сложности": "1/4"},
                {"id": 2, "название": "Красный дракон", "тип": "Дракон", "рейтинг_сложности": 17},
                {"id": 3, "название": "Огр", "тип": "Великан", "рейтинг_сложности": 2}
            ],
            "предметы": [
                {"id": 1, "название": "Кольцо невидимости", "редкость": "Легендарный"},
                {"id": 2, "название": "Зелье лечения", "редкость": "Обычный"},
                {"id": 3, "название": "Плащ эльфов", "редкость": "Редкий"}
            ],
            "черты_рас": [
                {"id": 1, "раса_id": 1, "название": "Тёмное зрение"},
                {"id": 2, "раса_id": 1, "название": "Транс"},
                {"id": 3, "раса_id": 2, "название": "Дварфийская стойкость"}
            ],
            "умения_классов": [
                {"id": 1, "класс_id": 1, "название": "Магическое восстановление"},
                {"id": 2, "класс_id": 2, "название": "Второе дыхание"}
            ],
            "способности_монстров": [
                {"id": 1, "монстр_id": 2, "название": "Огненное дыхание"}
            ],
            "классы_заклинаний": [
                {"класс_id": 1, "заклинание_id": 1},
                {"класс_id": 1, "заклинание_id": 2},
                {"класс_id": 99, "заклинание_id": 1}
            ]
        })
    }

    pub fn standard_document() -> CatalogDocument {
        CatalogDocument::from_value(standard_catalog()).expect("fixture catalog is valid")
    }

    pub fn test_config() -> Config {
        Config {
            database_url: "sqlite::memory:".to_string(),
            search_debounce: Duration::from_millis(10),
            bcrypt_cost: 4,
            ..Config::default()
        }
    }

    fn init_test_tracing() {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new("debug"))
                .with_test_writer()
                .try_init();
        });
    }

    pub struct TestAccount {
        pub username: String,
        pub password: String,
        pub is_active: bool,
        pub hashed: bool,
    }

    pub struct TestStateBuilder {
        accounts: Vec<TestAccount>,
        document: CatalogDocument,
        seed_game_sessions: bool,
        config: Config,
    }

    impl Default for TestStateBuilder {
        fn default() -> Self {
            Self {
                accounts: Vec::new(),
                document: CatalogDocument::new(),
                seed_game_sessions: false,
                config: test_config(),
            }
        }
    }

    impl TestStateBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn member(mut self, username: &str) -> Self {
            self.accounts.push(TestAccount {
                username: username.to_string(),
                password: STANDARD_PASSWORD.to_string(),
                is_active: true,
                hashed: true,
            });
            self
        }

        pub fn inactive_member(mut self, username: &str) -> Self {
            self.accounts.push(TestAccount {
                username: username.to_string(),
                password: STANDARD_PASSWORD.to_string(),
                is_active: false,
                hashed: true,
            });
            self
        }

        /// An account whose password was stored verbatim by an older client.
        pub fn legacy_member(mut self, username: &str, password: &str) -> Self {
            self.accounts.push(TestAccount {
                username: username.to_string(),
                password: password.to_string(),
                is_active: true,
                hashed: false,
            });
            self
        }

        pub fn catalog(mut self, document: CatalogDocument) -> Self {
            self.document = document;
            self
        }

        pub fn standard_catalog(self) -> Self {
            self.catalog(standard_document())
        }

        pub fn import_limit_mib(mut self, mib: u64) -> Self {
            self.config.import_limit_mib = mib;
            self
        }

        pub fn with_game_sessions(mut self) -> Self {
            self.seed_game_sessions = true;
            self
        }

        pub async fn build(self) -> Result<AppState, AppError> {
            init_test_tracing();

            let kv = KvStore::in_memory().await?;

            if !self.accounts.is_empty() {
                let mut stored = Vec::new();
                for (index, account) in self.accounts.iter().enumerate() {
                    let password = if account.hashed {
                        bcrypt::hash(&account.password, self.config.bcrypt_cost)?
                    } else {
                        account.password.clone()
                    };

                    stored.push(Account {
                        id: 1000 + index as i64,
                        username: account.username.clone(),
                        password,
                        email: None,
                        is_active: account.is_active,
                        is_admin: account.username == "admin",
                        created_at: Utc::now(),
                    });
                }
                kv.set(keys::USERS, &stored).await?;
            }

            let state = AppState::new(self.config, kv, self.document);

            if self.seed_game_sessions {
                state.game_sessions.seed_if_absent().await?;
            }

            Ok(state)
        }
    }

    pub async fn create_standard_test_state() -> AppState {
        TestStateBuilder::new()
            .member("admin")
            .member("frodo")
            .inactive_member("boromir")
            .standard_catalog()
            .with_game_sessions()
            .build()
            .await
            .expect("Failed to build test state")
    }

    pub async fn setup_test_client(state: AppState) -> Client {
        Client::tracked(init_rocket(state, None))
            .await
            .expect("valid rocket instance")
    }

    pub async fn login_test_user(client: &Client, username: &str, password: &str) {
        let response = client
            .post("/api/login")
            .header(ContentType::JSON)
            .body(json!({ "username": username, "password": password }).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.expect("login body");
        assert_eq!(body["data"]["success"], json!(true), "login failed: {body}");
    }

    pub fn state(client: &Client) -> &AppState {
        client
            .rocket()
            .state::<AppState>()
            .expect("managed application state")
    }
}
