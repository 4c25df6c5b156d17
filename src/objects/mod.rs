use serde::{Deserialize, Serialize};

mod friend_request;
mod me;
mod user;

pub use friend_request::FriendRequest;
pub use friend_request::FriendRequestBuilder;
pub use friend_request::IncomingRequest;
pub use friend_request::IncomingRequests;
pub use friend_request::OutgoingRequest;
pub use friend_request::RequestStatus;
pub use me::Credentials;
pub use me::Me;
pub use me::MeBuilder;
pub use me::NewUser;
pub use me::Profile;
pub use user::User;

/// Page size shared by every paginated listing
pub const PAGE_LIMIT: i64 = 9;

#[derive(Deserialize, Default)]
pub struct PageQuery {
    page: Option<i64>,
    search: Option<String>,
}

impl PageQuery {
    pub fn new(page: Option<i64>, search: Option<&str>) -> Self {
        Self {
            page,
            search: search.map(str::to_string),
        }
    }

    /// 1-indexed, anything below 1 is treated as the first page
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(PAGE_LIMIT)
    }

    pub fn search(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|search| !search.is_empty())
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum Total {
    TotalUsers(i64),
    TotalFriends(i64),
}

impl Total {
    pub fn count(&self) -> i64 {
        match self {
            Total::TotalUsers(count) | Total::TotalFriends(count) => *count,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    #[serde(flatten)]
    pub total: Total,
    pub limit: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    pub next_page: Option<i64>,
    pub prev_page: Option<i64>,
}

impl Pagination {
    pub fn new(current_page: i64, total: Total) -> Self {
        let total_pages = (total.count() + PAGE_LIMIT - 1) / PAGE_LIMIT;
        let has_next_page = current_page < total_pages;
        let has_prev_page = current_page > 1;

        Self {
            current_page,
            total_pages,
            total,
            limit: PAGE_LIMIT,
            has_next_page,
            has_prev_page,
            next_page: has_next_page.then_some(current_page + 1),
            prev_page: has_prev_page.then_some(current_page - 1),
        }
    }
}

/// A page of results, with the top level shortcuts infinite scrolling clients use
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Paged<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
    pub next_page: Option<i64>,
    pub has_more: bool,
    pub current_page: i64,
}

impl<T> Paged<T> {
    pub fn new(data: Vec<T>, pagination: Pagination) -> Self {
        Self {
            data,
            next_page: pagination.next_page,
            has_more: pagination.has_next_page,
            current_page: pagination.current_page,
            pagination,
        }
    }
}
