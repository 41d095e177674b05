// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! An in-process stand-in for the flashcard backend, for tests.

use std::sync::Arc;
use std::sync::Mutex;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::routing::get;
use axum::routing::patch;
use axum::routing::post;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use tokio::net::TcpListener;

use crate::api::types::RemoteCard;

pub const VALID_TOKEN: &str = "abc";

type Reply = (StatusCode, Json<Value>);
type Shared = Arc<Mutex<MockState>>;

struct MockUser {
    name: String,
    email: String,
    password: String,
}

struct MockState {
    users: Vec<MockUser>,
    cards: Vec<RemoteCard>,
    next_card_id: i64,
    tokens: Vec<String>,
    requests: Vec<String>,
}

pub struct MockBackend {
    base_url: String,
    state: Shared,
}

impl MockBackend {
    /// Starts the backend on a free port. Knows one user, `a@b.com` with
    /// password `secret`, and no cards.
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState {
            users: vec![MockUser {
                name: "A".to_string(),
                email: "a@b.com".to_string(),
                password: "secret".to_string(),
            }],
            cards: Vec::new(),
            next_card_id: 1,
            tokens: vec![VALID_TOKEN.to_string()],
            requests: Vec::new(),
        }));
        let app = Router::new();
        let app = app.route("/health", get(health));
        let app = app.route("/auth/login", post(login));
        let app = app.route("/auth/register", post(register));
        let app = app.route("/api/flash-cards", get(list_cards).post(create_card));
        let app = app.route(
            "/api/flash-cards/{id}",
            patch(update_card).delete(delete_card),
        );
        let app = app.with_state(state.clone());

        let port = portpicker::pick_unused_port().unwrap();
        let bind = format!("127.0.0.1:{port}");
        let listener = TcpListener::bind(&bind).await.unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });
        Self {
            base_url: format!("http://{bind}"),
            state,
        }
    }

    pub fn base_url(&self) -> String {
        self.base_url.clone()
    }

    /// Every request received so far, as `METHOD /path`.
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Invalidates every issued token.
    pub fn revoke_tokens(&self) {
        self.state.lock().unwrap().tokens.clear();
    }

    pub fn seed_cards(&self, cards: &[(&str, &str)]) {
        let mut state = self.state.lock().unwrap();
        for (front, back) in cards {
            let id = state.next_card_id;
            state.next_card_id += 1;
            state.cards.push(RemoteCard {
                id,
                front: front.to_string(),
                back: back.to_string(),
            });
        }
    }

    pub fn cards(&self) -> Vec<RemoteCard> {
        self.state.lock().unwrap().cards.clone()
    }
}

fn card_json(card: &RemoteCard) -> Value {
    json!({"id": card.id, "front": card.front, "back": card.back})
}

fn authorize(state: &mut MockState, headers: &HeaderMap, request: String) -> Result<(), Reply> {
    state.requests.push(request);
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let valid = state
        .tokens
        .iter()
        .any(|token| header == format!("Bearer {token}"));
    if valid {
        Ok(())
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Unauthenticated."})),
        ))
    }
}

async fn health() -> Reply {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login(State(state): State<Shared>, Json(body): Json<LoginBody>) -> Reply {
    let mut state = state.lock().unwrap();
    state.requests.push("POST /auth/login".to_string());
    if body.email == "crash@b.com" {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "Server Error"})),
        );
    }
    if body.email == "locked@b.com" {
        return (
            StatusCode::OK,
            Json(json!({"ok": false, "error": "account locked"})),
        );
    }
    let user = state
        .users
        .iter()
        .find(|user| user.email == body.email && user.password == body.password)
        .map(|user| json!({"email": user.email, "name": user.name}));
    match user {
        Some(user) => {
            if !state.tokens.iter().any(|token| token == VALID_TOKEN) {
                state.tokens.push(VALID_TOKEN.to_string());
            }
            (
                StatusCode::OK,
                Json(json!({"ok": true, "access_token": VALID_TOKEN, "user": user})),
            )
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Unauthorized"})),
        ),
    }
}

#[derive(Deserialize)]
struct RegisterBody {
    name: String,
    email: String,
    password: String,
}

async fn register(State(state): State<Shared>, Json(body): Json<RegisterBody>) -> Reply {
    let mut state = state.lock().unwrap();
    state.requests.push("POST /auth/register".to_string());
    match body.name.as_str() {
        "boom" => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "database unavailable"})),
            );
        }
        "silent" => return (StatusCode::INTERNAL_SERVER_ERROR, Json(Value::Null)),
        "closed" => {
            return (
                StatusCode::OK,
                Json(json!({"ok": false, "error": "registration closed"})),
            );
        }
        _ => {}
    }
    if state.users.iter().any(|user| user.email == body.email) {
        return (
            StatusCode::OK,
            Json(json!({"errors": {"email": ["already taken"]}})),
        );
    }
    let mut errors = Map::new();
    if body.name.trim().is_empty() {
        errors.insert("name".to_string(), json!(["name is required"]));
    }
    if body.password.len() < 6 {
        errors.insert("password".to_string(), json!(["password is too short"]));
    }
    if !errors.is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"errors": errors})),
        );
    }
    let id = state.users.len() as i64 + 1;
    state.users.push(MockUser {
        name: body.name.clone(),
        email: body.email.clone(),
        password: body.password,
    });
    // This one answers with blank identity fields.
    let user = if body.name == "anonymous" {
        json!({"id": id, "email": "", "name": ""})
    } else {
        json!({"id": id, "email": body.email, "name": body.name})
    };
    (
        StatusCode::CREATED,
        Json(json!({
            "ok": true,
            "access_token": VALID_TOKEN,
            "token_type": "Bearer",
            "user": user,
        })),
    )
}

async fn list_cards(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let mut state = state.lock().unwrap();
    if let Err(reply) = authorize(&mut state, &headers, "GET /api/flash-cards".to_string()) {
        return reply;
    }
    let cards: Vec<Value> = state.cards.iter().map(card_json).collect();
    (StatusCode::OK, Json(Value::Array(cards)))
}

#[derive(Deserialize)]
struct CardBody {
    front: String,
    back: String,
}

async fn create_card(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<CardBody>,
) -> Reply {
    let mut state = state.lock().unwrap();
    if let Err(reply) = authorize(&mut state, &headers, "POST /api/flash-cards".to_string()) {
        return reply;
    }
    if body.front.trim().is_empty() {
        return (
            StatusCode::OK,
            Json(json!({"ok": false, "error": "front is required"})),
        );
    }
    if body.front == "invalid" {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"errors": {"front": ["front is invalid"]}})),
        );
    }
    let card = RemoteCard {
        id: state.next_card_id,
        front: body.front,
        back: body.back,
    };
    state.next_card_id += 1;
    let reply = json!({"ok": true, "card": card_json(&card)});
    // Newest first, the way the collection is served.
    state.cards.insert(0, card);
    (StatusCode::CREATED, Json(reply))
}

async fn update_card(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<CardBody>,
) -> Reply {
    let mut state = state.lock().unwrap();
    if let Err(reply) = authorize(&mut state, &headers, format!("PATCH /api/flash-cards/{id}")) {
        return reply;
    }
    match state.cards.iter_mut().find(|card| card.id == id) {
        Some(card) => {
            card.front = body.front;
            card.back = body.back;
            (
                StatusCode::OK,
                Json(json!({"ok": true, "card": card_json(card)})),
            )
        }
        None => (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))),
    }
}

async fn delete_card(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Reply {
    let mut state = state.lock().unwrap();
    if let Err(reply) = authorize(&mut state, &headers, format!("DELETE /api/flash-cards/{id}")) {
        return reply;
    }
    let before = state.cards.len();
    state.cards.retain(|card| card.id != id);
    if state.cards.len() < before {
        (StatusCode::OK, Json(json!({"ok": true})))
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"error": "not found"})))
    }
}
