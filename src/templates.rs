use askama::Template;
use askama_web::WebTemplate;

#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub(crate) struct LoginTemplate {
    pub(crate) app_name: String,
    pub(crate) error: String,
    pub(crate) next: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "register.html")]
pub(crate) struct RegisterTemplate {
    pub(crate) app_name: String,
    pub(crate) error: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub(crate) struct DashboardTemplate {
    pub(crate) app_name: String,
    pub(crate) display_name: String,
    pub(crate) organization: String,
    pub(crate) plan_tier: String,
    pub(crate) unread: usize,
    pub(crate) entries: Vec<NotificationRow>,
}

pub(crate) struct NotificationRow {
    pub(crate) id: String,
    pub(crate) category: String,
    pub(crate) title: String,
    pub(crate) message: String,
    pub(crate) created_at: String,
    pub(crate) read: bool,
}
