//! Request path splitting

/// Split a request path into the segments the resolver walks.
///
/// Empty segments and the relative segments `.` and `..` are dropped, so no
/// segment can climb out of the routes root. Segments are not decoded.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/')
        .filter(|segment| !matches!(*segment, "" | "." | ".."))
        .collect()
}
