//! Defaulting and inheritance
//!
//! Course-level defaults are pushed down onto releases in four passes, in this
//! order: namespace, repository, chart name, namespace management policy.
//! Every pass only fills what a release left unset, so applying them twice
//! gives the same course as applying them once.

use tracing::debug;

use crate::course::{Course, NamespaceConfig, Release};

/// Run every defaulting pass over a course
pub fn apply(course: Course) -> Course {
    let course = populate_default_namespace(course);
    let course = populate_default_repository(course);
    let course = populate_chart_names(course);
    populate_namespace_management(course)
}

fn map_releases(course: Course, f: impl Fn(Release) -> Release) -> Course {
    Course {
        releases: course.releases.into_iter().map(f).collect(),
        ..course
    }
}

/// Releases without a namespace get the course default namespace
pub fn populate_default_namespace(course: Course) -> Course {
    let Some(default) = course.default_namespace.clone() else {
        debug!("no default namespace set, skipping");
        return course;
    };
    map_releases(course, |mut release| {
        if release.namespace.is_none() {
            debug!(release = %release.name, namespace = %default, "using default namespace");
            release.namespace = Some(default.clone());
        }
        release
    })
}

/// Releases without a repository get the course default repository
pub fn populate_default_repository(course: Course) -> Course {
    let Some(default) = course.default_repository.clone() else {
        debug!("no default repository set, skipping");
        return course;
    };
    map_releases(course, |mut release| {
        if release.repository.is_none() {
            debug!(release = %release.name, repository = %default, "using default repository");
            release.repository = Some(default.clone());
        }
        release
    })
}

/// Releases without a chart install the chart named after the release
pub fn populate_chart_names(course: Course) -> Course {
    map_releases(course, |mut release| {
        if release.chart.is_none() {
            release.chart = Some(release.name.clone());
        }
        release
    })
}

/// Normalize the course policy and merge it into every release policy
pub fn populate_namespace_management(mut course: Course) -> Course {
    let mut default = course.namespace_management.default.take().unwrap_or_default();
    default.settings.overwrite.get_or_insert(false);
    course.namespace_management.default = Some(default.clone());

    map_releases(course, |mut release| {
        let policy = match release.namespace_management.take() {
            Some(own) => merge_namespace_management(&default, own),
            None => {
                debug!(release = %release.name, "using default namespace management");
                default.clone()
            }
        };
        release.namespace_management = Some(policy);
        release
    })
}

/// Merge a course default policy into a release policy
///
/// Keys present only in the default are added; keys the release already has
/// keep the release's value. The release inherits `overwrite` only when it did
/// not state one.
pub fn merge_namespace_management(defaults: &NamespaceConfig, mut into: NamespaceConfig) -> NamespaceConfig {
    for (key, value) in &defaults.metadata.annotations {
        into.metadata
            .annotations
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }
    for (key, value) in &defaults.metadata.labels {
        into.metadata
            .labels
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }
    if into.settings.overwrite.is_none() {
        into.settings.overwrite = defaults.settings.overwrite;
    }
    into
}
