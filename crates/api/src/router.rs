use crate::{clock::Clock, error, App, Registered};
use core::num::NonZeroU64;
use db::Store;
use http_body_util::{BodyExt, Full};
use hyper::{
    body::{Body, Bytes},
    header::{HeaderValue, CONTENT_TYPE},
    Method, Request, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};

pub type Reply = Response<Full<Bytes>>;

fn json_with_status(status: StatusCode, body: Vec<u8>) -> Reply {
    let mut res = Response::new(Full::new(Bytes::from(body)));
    *res.status_mut() = status;
    assert!(res.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json")).is_none());
    res
}

fn failure(status: StatusCode, message: &str) -> Reply {
    let body = serde_json::json!({ "error": message }).to_string();
    json_with_status(status, body.into_bytes())
}

/// Renders the outcome of an operation, successful or not, as a JSON reply.
fn reply<T: Serialize>(status: StatusCode, result: error::Result<T>) -> Result<Reply, StatusCode> {
    match result {
        Ok(value) => {
            let body = serde_json::to_vec(&value).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
            Ok(json_with_status(status, body))
        }
        Err(err) => {
            if matches!(err, error::Error::Fatal) {
                log::error!("Request failed on our end.");
            }
            Ok(failure(err.status(), &err.to_string()))
        }
    }
}

async fn read_json<T, B>(body: B) -> Result<T, StatusCode>
where
    T: DeserializeOwned,
    B: Body,
{
    let bytes = body.collect().await.map_err(|_| StatusCode::BAD_REQUEST)?.to_bytes();
    serde_json::from_slice(&bytes).map_err(|_| StatusCode::BAD_REQUEST)
}

fn parse_id(text: &str) -> Result<NonZeroU64, StatusCode> {
    text.parse().map_err(|_| StatusCode::NOT_FOUND)
}

fn expect(method: &Method, expected: Method) -> Result<(), StatusCode> {
    if *method == expected {
        Ok(())
    } else {
        Err(StatusCode::METHOD_NOT_ALLOWED)
    }
}

async fn try_respond<S, C, B>(app: &App<S, C>, req: Request<B>) -> Result<Reply, StatusCode>
where
    S: Store,
    C: Clock,
    B: Body,
{
    let (parts, body) = req.into_parts();
    let segments: Vec<_> = parts.uri.path().split('/').filter(|segment| !segment.is_empty()).collect();
    let method = &parts.method;

    match segments.as_slice() {
        ["participants"] => {
            expect(method, Method::POST)?;
            let registration = read_json(body).await?;
            let result = app.register(registration).await.map(|id| Registered { id });
            reply(StatusCode::CREATED, result)
        }
        ["participants", pid, "current"] => {
            expect(method, Method::GET)?;
            let pid = parse_id(pid)?;
            reply(StatusCode::OK, app.poll(pid).await)
        }
        ["answers"] => {
            expect(method, Method::POST)?;
            let submission = read_json(body).await?;
            reply(StatusCode::OK, app.submit(submission).await)
        }
        ["quizzes"] => match *method {
            Method::GET => reply(StatusCode::OK, app.quizzes().await),
            Method::POST => {
                let authoring = read_json(body).await?;
                reply(StatusCode::CREATED, app.author(authoring).await)
            }
            _ => Err(StatusCode::METHOD_NOT_ALLOWED),
        },
        ["quizzes", qid, "stats"] => {
            expect(method, Method::GET)?;
            let qid = parse_id(qid)?;
            reply(StatusCode::OK, app.stats().standings(qid).await)
        }
        ["quizzes", qid, command @ ("start" | "next" | "reset")] => {
            expect(method, Method::POST)?;
            let qid = parse_id(qid)?;
            let engine = app.engine();
            let result = match *command {
                "start" => engine.start(qid).await,
                "next" => engine.advance(qid).await,
                _ => engine.reset(qid).await,
            };
            reply(StatusCode::OK, result)
        }
        _ => Err(StatusCode::NOT_FOUND),
    }
}

/// Serves one request. Every reply, including failures, carries a JSON body.
pub async fn respond<S, C, B>(app: &App<S, C>, req: Request<B>) -> Reply
where
    S: Store,
    C: Clock,
    B: Body,
{
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    match try_respond(app, req).await {
        Ok(res) => {
            log::debug!("{method} {path} -> {}", res.status());
            res
        }
        Err(status) => {
            log::debug!("{method} {path} -> {status}");
            failure(status, status.canonical_reason().unwrap_or("Unknown failure."))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{respond, Reply};
    use crate::tests::{app_with_quiz, TestApp};
    use http_body_util::{BodyExt, Full};
    use hyper::{body::Bytes, Method, Request, StatusCode};
    use serde_json::{json, Value};

    async fn call(app: &TestApp, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let body = body.map(|value| value.to_string()).unwrap_or_default();
        let req = Request::builder().method(method).uri(uri).body(Full::new(Bytes::from(body))).unwrap();
        let res: Reply = respond(app, req).await;
        let status = res.status();
        assert_eq!(res.headers()["content-type"], "application/json");
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn full_round_over_http() {
        let (app, _) = app_with_quiz(&[], 10).await;

        let (status, authored) = call(
            &app,
            Method::POST,
            "/quizzes",
            Some(json!({ "title": "Math", "duration": 15, "questions": "2+2=?||3||4||5||1\nbad" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(authored["skipped"], json!([2]));
        let quiz = authored["id"].as_u64().unwrap();

        let (status, registered) =
            call(&app, Method::POST, "/participants", Some(json!({ "quiz": quiz, "name": "Ann" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let pid = registered["id"].as_u64().unwrap();

        let current = format!("/participants/{pid}/current");
        assert_eq!(call(&app, Method::GET, &current, None).await.1, json!({ "phase": "waiting" }));

        let (status, progress) = call(&app, Method::POST, &format!("/quizzes/{quiz}/start"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(progress["current"], json!(0));

        let (_, view) = call(&app, Method::GET, &current, None).await;
        assert_eq!(view["phase"], "question");
        assert_eq!(view["index"], 0);
        assert_eq!(view["time_left"], 15);
        assert_eq!(view["choices"], json!(["3", "4", "5"]));
        let question = view["question_id"].as_u64().unwrap();

        let submission = json!({ "participant_id": pid, "question_id": question, "answer": 1 });
        let (status, receipt) = call(&app, Method::POST, "/answers", Some(submission.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt, json!({ "status": "accepted" }));
        let (_, receipt) = call(&app, Method::POST, "/answers", Some(submission)).await;
        assert_eq!(receipt, json!({ "status": "already_answered" }));

        let (_, progress) = call(&app, Method::POST, &format!("/quizzes/{quiz}/next"), None).await;
        assert_eq!(progress["current"], Value::Null);
        assert_eq!(call(&app, Method::GET, &current, None).await.1, json!({ "phase": "finished" }));

        let (_, stats) = call(&app, Method::GET, &format!("/quizzes/{quiz}/stats"), None).await;
        assert_eq!(stats[0]["participant"], pid);
        assert_eq!(stats[0]["answers"], 1);

        let (_, progress) = call(&app, Method::POST, &format!("/quizzes/{quiz}/reset"), None).await;
        assert_eq!(progress["started_at"], 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn answers_are_not_range_checked() {
        let (app, quiz) = app_with_quiz(&["A?||1||2||0", "B?||1||2||1"], 10).await;
        let (_, registered) =
            call(&app, Method::POST, "/participants", Some(json!({ "quiz": quiz.get(), "name": "Ann" }))).await;
        let pid = registered["id"].as_u64().unwrap();
        let first = crate::tests::question_at(&app, quiz, 0).await.get();
        let second = crate::tests::question_at(&app, quiz, 1).await.get();

        let wide = json!({ "participant_id": pid, "question_id": first, "answer": 40000 });
        let (status, receipt) = call(&app, Method::POST, "/answers", Some(wide)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt, json!({ "status": "accepted" }));

        let timed_out = json!({ "participant_id": pid, "question_id": second, "answer": -1 });
        let (status, receipt) = call(&app, Method::POST, "/answers", Some(timed_out)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt, json!({ "status": "accepted" }));

        let (_, stats) = call(&app, Method::GET, &format!("/quizzes/{quiz}/stats"), None).await;
        assert_eq!(stats[0]["answers"], 2);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn failures_are_explicit() {
        let (app, quiz) = app_with_quiz(&["A?||1||2||0"], 10).await;

        let (status, body) = call(&app, Method::GET, "/participants/999/current", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "participant not found" }));

        let (status, body) = call(&app, Method::POST, "/quizzes/999/next", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "quiz not found" }));

        let (status, _) =
            call(&app, Method::POST, "/participants", Some(json!({ "quiz": quiz, "name": "" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, Method::POST, "/answers", Some(json!({ "participant_id": 0 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, Method::GET, &format!("/quizzes/{quiz}/start"), None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, _) = call(&app, Method::GET, "/nowhere", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, quizzes) = call(&app, Method::GET, "/quizzes", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(quizzes[0]["id"], quiz.get());
        assert_eq!(quizzes[0]["questions"], 1);
    }
}
