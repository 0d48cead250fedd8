//! Fixed knowledge about the à la card consumer portal: where its pages live
//! and how their markup is laid out.

pub const DEFAULT_BASE_URL: &str = "https://www.euroticket-alacard.pt/";

pub const MAIN_PAGE: &str = "jsp/portlet/c_index.jsp?_reset=true&_portal=www.alacard.pt";
pub const LOGIN_ENDPOINT: &str = "jsp/portlet/consumer/jve/c_login.jsp";
pub const HISTORY_PAGE: &str = "jsp/portlet/c_consumerprogram_home.jsp?section.jsp:section=account&\
                                page.jsp:page=consumer/account/c_alltransactions.jsp";
pub const LOGOUT_PAGE: &str = "jsp/portlet/logout.jsp";

/// Charset the portal serves pages in when the response does not say.
pub const CHARSET: &str = "ISO-8859-1";

pub const USERNAME_FIELD: &str = "consumer/jve/c_login.jsp:login_id_form";
pub const PASSWORD_FIELD: &str = "consumer/jve/c_login.jsp:password_form";

/// Every named input of the login form.
pub const FORM_INPUTS: &str = "//form//input[@name]";

/// Summary rows: a label cell followed by a value cell.
pub const SUMMARY_ROWS: &str = "//tr";
pub const SUMMARY_LABEL: &str = "td[@class='formLabel']";
pub const SUMMARY_VALUE: &str = "td[@class='txt']";

/// History rows alternate between two row classes.
pub const MOVEMENT_ROWS: &str = "//tr[@class]";
pub const MOVEMENT_ROW_CLASSES: [&str; 2] = ["tablerowalt1", "tablerowalt2"];

/// Cells of a movement row, in page order.
pub const MOVEMENT_DATE: &str = "td[1]";
pub const MOVEMENT_ID: &str = "td[2]";
pub const MOVEMENT_TYPE: &str = "td[3]";
pub const MOVEMENT_DESCRIPTION: &str = "td[4]";
pub const MOVEMENT_CREDIT: &str = "td[5]";
pub const MOVEMENT_DEBIT: &str = "td[6]";
pub const MOVEMENT_BALANCE: &str = "td[7]";
