use cryptopoll::*;
use rocket::http::Status;
use rocket::response::status::{Created, Custom};
use rocket::response::{self, Responder};
use rocket::serde::json::{self, Json};
use rocket::{Build, Request, Rocket, State};

/// The coordinator the daemon serves: any store, the RFC 3526 group
pub type PollCoordinator = Coordinator<Box<dyn Store>, ElGamal>;

type Body<'r, T> = Result<Json<T>, json::Error<'r>>;

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    Poll(Error),
    Body(String),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError::Poll(e)
    }
}

pub fn status_for(kind: ErrorKind) -> Status {
    match kind {
        ErrorKind::ValidationError => Status::BadRequest,
        ErrorKind::NotFound => Status::NotFound,
        ErrorKind::Conflict => Status::Conflict,
        ErrorKind::InvalidState => Status::BadRequest,
        ErrorKind::PreconditionFailed => Status::BadRequest,
        ErrorKind::Forbidden => Status::Forbidden,
        ErrorKind::Internal => Status::InternalServerError,
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let (status, message) = match self {
            ApiError::Poll(e) => {
                let status = status_for(e.kind());
                if status == Status::InternalServerError {
                    error!("{} {}: {}", req.method(), req.uri(), e);
                }
                (status, e.public_message())
            }
            ApiError::Body(reason) => (Status::BadRequest, reason),
        };
        Custom(status, Json(MessageResponse::new(message))).respond_to(req)
    }
}

fn body<T>(data: Body<'_, T>) -> ApiResult<T> {
    data.map(Json::into_inner)
        .map_err(|e| ApiError::Body(format!("Malformed request body: {}", e)))
}

fn poll_id(id: &str) -> ApiResult<PollId> {
    Ok(id.parse::<PollId>()?)
}

fn ack(message: &str) -> Json<MessageResponse> {
    Json(MessageResponse::new(message))
}

fn created(id: PollId, message: &str) -> Created<Json<MessageResponse>> {
    Created::new(format!("/api/polls/{}", id)).body(ack(message))
}

#[get("/health-check")]
fn health_check() -> &'static str {
    "OK"
}

#[post("/polls/create", data = "<req>")]
fn create_poll(
    coordinator: &State<PollCoordinator>,
    req: Body<'_, CreatePollRequest>,
) -> ApiResult<Created<Json<CreatedPoll>>> {
    let req = body(req)?;
    let poll = coordinator.create_poll(&req.poll_name, req.choices, req.max_participants)?;
    let location = format!("/api/polls/{}", poll.poll.id);
    Ok(Created::new(location).body(Json(poll)))
}

#[get("/polls/<id>")]
fn fetch_poll(coordinator: &State<PollCoordinator>, id: &str) -> ApiResult<Json<PollView>> {
    let id = poll_id(id)?;
    Ok(Json(coordinator.fetch_poll(id)?))
}

#[delete("/polls/<id>", data = "<req>")]
fn delete_poll(
    coordinator: &State<PollCoordinator>,
    id: &str,
    req: Body<'_, CreatorTokenRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let id = poll_id(id)?;
    let req = body(req)?;
    coordinator.delete_poll(id, &req.creator_token)?;
    Ok(ack("Poll deleted successfully"))
}

#[post("/polls/<id>/register", data = "<req>")]
fn register_voter(
    coordinator: &State<PollCoordinator>,
    id: &str,
    req: Body<'_, RegisterRequest>,
) -> ApiResult<Created<Json<MessageResponse>>> {
    let id = poll_id(id)?;
    let req = body(req)?;
    coordinator.register_voter(id, &req.voter_name)?;
    Ok(created(id, "Voter registered successfully"))
}

#[post("/polls/<id>/close", data = "<req>")]
fn close_poll(
    coordinator: &State<PollCoordinator>,
    id: &str,
    req: Body<'_, CreatorTokenRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let id = poll_id(id)?;
    let req = body(req)?;
    coordinator.close_poll(id, &req.creator_token)?;
    Ok(ack("Poll closed successfully"))
}

#[post("/polls/<id>/public-key-share", data = "<req>")]
fn submit_public_key_share(
    coordinator: &State<PollCoordinator>,
    id: &str,
    req: Body<'_, PublicKeyShareRequest>,
) -> ApiResult<Created<Json<MessageResponse>>> {
    let id = poll_id(id)?;
    let req = body(req)?;
    coordinator.submit_public_key_share(id, req.public_key_share)?;
    Ok(created(id, "Public key share submitted successfully"))
}

#[post("/polls/<id>/vote", data = "<req>")]
fn submit_vote(
    coordinator: &State<PollCoordinator>,
    id: &str,
    req: Body<'_, VoteRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let id = poll_id(id)?;
    let req = body(req)?;
    coordinator.submit_vote(id, req.votes)?;
    Ok(ack("Vote submitted successfully"))
}

#[post("/polls/<id>/decryption-shares", data = "<req>")]
fn submit_decryption_shares(
    coordinator: &State<PollCoordinator>,
    id: &str,
    req: Body<'_, DecryptionSharesRequest>,
) -> ApiResult<Created<Json<MessageResponse>>> {
    let id = poll_id(id)?;
    let req = body(req)?;
    coordinator.submit_decryption_shares(id, req.decryption_shares)?;
    Ok(created(id, "Decryption shares submitted successfully."))
}

#[catch(default)]
fn default_catcher(status: Status, _req: &Request) -> Json<MessageResponse> {
    let message = match status.code {
        404 => "Not found",
        _ => status.reason().unwrap_or("Request failed"),
    };
    Json(MessageResponse::new(message))
}

/// Build the daemon around a coordinator
pub fn build(coordinator: PollCoordinator) -> Rocket<Build> {
    rocket::build()
        .manage(coordinator)
        .mount("/", routes![health_check])
        .mount(
            "/api",
            routes![
                create_poll,
                fetch_poll,
                delete_poll,
                register_voter,
                close_poll,
                submit_public_key_share,
                submit_vote,
                submit_decryption_shares
            ],
        )
        .register("/", catchers![default_catcher])
}
