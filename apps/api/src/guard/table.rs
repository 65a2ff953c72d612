use crate::models::principal::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Public,
    /// Any signed-in, onboarded principal.
    Authenticated,
    /// Any signed-in principal; forwarded to their role's dashboard.
    RoleDispatch,
    /// Onboarding screen, reachable only while it is the current destination.
    OnboardingScreen,
    Role(Role),
}

/// Static route table. Entries match whole path segments, first match wins.
const ROUTE_TABLE: &[(&str, Requirement)] = &[
    ("/admin", Requirement::Role(Role::Admin)),
    ("/hire", Requirement::Role(Role::Employer)),
    ("/employer", Requirement::Role(Role::Employer)),
    ("/jobseeker", Requirement::Role(Role::JobSeeker)),
    ("/dashboard", Requirement::RoleDispatch),
    ("/profile", Requirement::Authenticated),
    ("/select-role", Requirement::OnboardingScreen),
];

/// Drops the query string and fragment, resolves `.` and `..` segments,
/// collapses repeated and trailing slashes and lowercases the result.
pub fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/")).to_lowercase()
}

pub fn required_access(path: &str) -> Requirement {
    let path = normalize_path(path);
    ROUTE_TABLE
        .iter()
        .find(|(prefix, _)| {
            path == *prefix
                || path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
        .map(|(_, requirement)| *requirement)
        .unwrap_or(Requirement::Public)
}
