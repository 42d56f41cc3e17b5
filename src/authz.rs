//! Role-based access resolution.
//!
//! Every route funnels through one declarative policy table keyed by
//! (resource, action) instead of per-route conditionals. The table names
//! which scope relations grant access and what happens on a miss:
//! out-of-scope rows are either denied outright (403) or hidden (404) so
//! their existence does not leak.

use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Department,
    DepartmentAdmin,
    Program,
    ProgramManagement,
    Thesis,
    User,
}

/// Where the target row hangs in the organisation structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ownership {
    /// Owned by a department.
    Department(String),
    /// Owned by a program.
    Program(String),
    /// Owned by a program, and the action is approval-gated.
    ProgramApproval(String),
    /// A thesis row; supervisors get limited access alongside managers.
    Thesis {
        program_id: String,
        supervisor_ids: Vec<String>,
    },
    /// A user's own record.
    User(String),
    /// Not tied to any scope.
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Forbidden,
    NotFound,
}

/// The caller's resolved scope, built once per request from the session
/// user plus their department-admin and program-management links.
#[derive(Debug, Clone, Default)]
pub struct AccessScope {
    pub user_id: String,
    pub is_admin: bool,
    /// Departments the caller administers.
    pub departments: HashSet<String>,
    /// Programs the caller manages, with the thesis-approver flag.
    pub programs: HashMap<String, bool>,
}

impl AccessScope {
    #[must_use]
    pub fn manages_department(&self, department_id: &str) -> bool {
        self.departments.contains(department_id)
    }

    #[must_use]
    pub fn manages_program(&self, program_id: &str) -> bool {
        self.programs.contains_key(program_id)
    }

    #[must_use]
    pub fn is_approver_for(&self, program_id: &str) -> bool {
        self.programs.get(program_id).copied().unwrap_or(false)
    }
}

/// A scope relation that can satisfy a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Requires {
    /// Any authenticated employee.
    Employee,
    /// The target row belongs to the caller.
    SelfUser,
    /// The caller administers the owning department.
    DepartmentAdmin,
    /// The caller manages the owning program.
    ProgramManager,
    /// The caller manages the owning program with the approver flag.
    ProgramApprover,
    /// The caller supervises the target thesis.
    Supervisor,
}

/// Miss behavior when no relation holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Miss {
    Forbid,
    Hide,
}

struct Rule {
    resource: Resource,
    action: Action,
    any_of: &'static [Requires],
    miss: Miss,
}

const POLICY: &[Rule] = &[
    // Departments: names are public (listable with include_not_managed),
    // so failed mutations are plain 403s.
    Rule {
        resource: Resource::Department,
        action: Action::Read,
        any_of: &[Requires::Employee],
        miss: Miss::Forbid,
    },
    Rule {
        resource: Resource::Department,
        action: Action::Create,
        any_of: &[],
        miss: Miss::Forbid,
    },
    Rule {
        resource: Resource::Department,
        action: Action::Delete,
        any_of: &[],
        miss: Miss::Forbid,
    },
    // Department admin links: scoped to the administered department;
    // out-of-scope reads/deletes are hidden.
    Rule {
        resource: Resource::DepartmentAdmin,
        action: Action::Read,
        any_of: &[Requires::DepartmentAdmin],
        miss: Miss::Hide,
    },
    Rule {
        resource: Resource::DepartmentAdmin,
        action: Action::Create,
        any_of: &[Requires::DepartmentAdmin],
        miss: Miss::Forbid,
    },
    Rule {
        resource: Resource::DepartmentAdmin,
        action: Action::Delete,
        any_of: &[Requires::DepartmentAdmin],
        miss: Miss::Hide,
    },
    // Programs come from the directory sync and are readable by everyone;
    // only admins touch them.
    Rule {
        resource: Resource::Program,
        action: Action::Read,
        any_of: &[Requires::Employee],
        miss: Miss::Forbid,
    },
    Rule {
        resource: Resource::Program,
        action: Action::Create,
        any_of: &[],
        miss: Miss::Forbid,
    },
    Rule {
        resource: Resource::Program,
        action: Action::Update,
        any_of: &[],
        miss: Miss::Forbid,
    },
    // Program management links: managers administer their own programs.
    // Granting the approver flag is approval-gated (Ownership::ProgramApproval).
    Rule {
        resource: Resource::ProgramManagement,
        action: Action::Read,
        any_of: &[Requires::ProgramManager],
        miss: Miss::Hide,
    },
    Rule {
        resource: Resource::ProgramManagement,
        action: Action::Create,
        any_of: &[Requires::ProgramManager],
        miss: Miss::Forbid,
    },
    Rule {
        resource: Resource::ProgramManagement,
        action: Action::Delete,
        any_of: &[Requires::ProgramManager],
        miss: Miss::Hide,
    },
    // Theses: managers see their programs, supervisors see their own.
    // Everything out of scope is hidden.
    Rule {
        resource: Resource::Thesis,
        action: Action::Read,
        any_of: &[Requires::ProgramManager, Requires::Supervisor],
        miss: Miss::Hide,
    },
    Rule {
        resource: Resource::Thesis,
        action: Action::Create,
        any_of: &[Requires::Employee],
        miss: Miss::Forbid,
    },
    Rule {
        resource: Resource::Thesis,
        action: Action::Update,
        any_of: &[Requires::ProgramManager, Requires::Supervisor],
        miss: Miss::Hide,
    },
    Rule {
        resource: Resource::Thesis,
        action: Action::Delete,
        any_of: &[Requires::ProgramManager],
        miss: Miss::Hide,
    },
    // User records: anyone can look up users (supervisor pickers), only
    // the user themself or their department admin beyond that.
    Rule {
        resource: Resource::User,
        action: Action::Read,
        any_of: &[Requires::Employee],
        miss: Miss::Forbid,
    },
    Rule {
        resource: Resource::User,
        action: Action::Update,
        any_of: &[Requires::SelfUser, Requires::DepartmentAdmin],
        miss: Miss::Hide,
    },
];

fn satisfies(scope: &AccessScope, requires: Requires, ownership: &Ownership) -> bool {
    match requires {
        Requires::Employee => true,
        Requires::SelfUser => matches!(ownership, Ownership::User(id) if *id == scope.user_id),
        Requires::DepartmentAdmin => {
            matches!(ownership, Ownership::Department(id) if scope.manages_department(id))
        }
        Requires::ProgramManager => match ownership {
            Ownership::Program(id) => scope.manages_program(id),
            Ownership::ProgramApproval(id) => scope.is_approver_for(id),
            Ownership::Thesis { program_id, .. } => scope.manages_program(program_id),
            _ => false,
        },
        Requires::ProgramApprover => match ownership {
            Ownership::Program(id) | Ownership::ProgramApproval(id) => scope.is_approver_for(id),
            Ownership::Thesis { program_id, .. } => scope.is_approver_for(program_id),
            _ => false,
        },
        Requires::Supervisor => {
            matches!(ownership, Ownership::Thesis { supervisor_ids, .. }
                if supervisor_ids.iter().any(|id| *id == scope.user_id))
        }
    }
}

/// Resolves one (caller, action, target) triple against the policy table.
#[must_use]
pub fn resolve(
    scope: &AccessScope,
    action: Action,
    resource: Resource,
    ownership: &Ownership,
) -> Decision {
    if scope.is_admin {
        return Decision::Allow;
    }

    let Some(rule) = POLICY
        .iter()
        .find(|r| r.resource == resource && r.action == action)
    else {
        return Decision::Forbidden;
    };

    if rule
        .any_of
        .iter()
        .any(|req| satisfies(scope, *req, ownership))
    {
        return Decision::Allow;
    }

    match rule.miss {
        Miss::Forbid => Decision::Forbidden,
        Miss::Hide => Decision::NotFound,
    }
}

/// Row filter for list endpoints; the resolver equivalent of a WHERE clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListFilter {
    /// No restriction (admins).
    All,
    /// Restrict to the given departments.
    Departments(HashSet<String>),
    /// Restrict to managed programs plus rows the caller supervises.
    ProgramsOrSupervised {
        programs: HashSet<String>,
        user_id: String,
    },
}

/// Returns the filter a list operation must apply for this caller.
#[must_use]
pub fn list_filter(scope: &AccessScope, resource: Resource) -> ListFilter {
    if scope.is_admin {
        return ListFilter::All;
    }
    match resource {
        Resource::Department | Resource::DepartmentAdmin | Resource::User => {
            ListFilter::Departments(scope.departments.clone())
        }
        Resource::Program | Resource::ProgramManagement | Resource::Thesis => {
            ListFilter::ProgramsOrSupervised {
                programs: scope.programs.keys().cloned().collect(),
                user_id: scope.user_id.clone(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> AccessScope {
        AccessScope {
            user_id: "admin".into(),
            is_admin: true,
            ..Default::default()
        }
    }

    fn department_admin(department_id: &str) -> AccessScope {
        AccessScope {
            user_id: "dept-admin".into(),
            departments: HashSet::from([department_id.to_string()]),
            ..Default::default()
        }
    }

    fn program_manager(program_id: &str, approver: bool) -> AccessScope {
        AccessScope {
            user_id: "manager".into(),
            programs: HashMap::from([(program_id.to_string(), approver)]),
            ..Default::default()
        }
    }

    fn employee(user_id: &str) -> AccessScope {
        AccessScope {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_admin_bypasses_all_scoping() {
        let scope = admin();
        for action in [Action::Read, Action::Create, Action::Update, Action::Delete] {
            assert_eq!(
                resolve(
                    &scope,
                    action,
                    Resource::DepartmentAdmin,
                    &Ownership::Department("anything".into())
                ),
                Decision::Allow
            );
        }
    }

    #[test]
    fn test_department_admin_create_in_own_department() {
        let scope = department_admin("math");
        assert_eq!(
            resolve(
                &scope,
                Action::Create,
                Resource::DepartmentAdmin,
                &Ownership::Department("math".into())
            ),
            Decision::Allow
        );
    }

    #[test]
    fn test_department_admin_create_elsewhere_is_forbidden() {
        let scope = department_admin("math");
        assert_eq!(
            resolve(
                &scope,
                Action::Create,
                Resource::DepartmentAdmin,
                &Ownership::Department("physics".into())
            ),
            Decision::Forbidden
        );
    }

    #[test]
    fn test_department_admin_delete_elsewhere_is_hidden() {
        let scope = department_admin("math");
        assert_eq!(
            resolve(
                &scope,
                Action::Delete,
                Resource::DepartmentAdmin,
                &Ownership::Department("physics".into())
            ),
            Decision::NotFound
        );
    }

    #[test]
    fn test_plain_employee_denied_administrative_collections() {
        let scope = employee("teacher");
        assert_eq!(
            resolve(
                &scope,
                Action::Create,
                Resource::Department,
                &Ownership::Global
            ),
            Decision::Forbidden
        );
        assert_eq!(
            resolve(
                &scope,
                Action::Create,
                Resource::DepartmentAdmin,
                &Ownership::Department("math".into())
            ),
            Decision::Forbidden
        );
    }

    #[test]
    fn test_manager_grants_management_only_in_own_program() {
        let scope = program_manager("cs-msc", false);
        assert_eq!(
            resolve(
                &scope,
                Action::Create,
                Resource::ProgramManagement,
                &Ownership::Program("cs-msc".into())
            ),
            Decision::Allow
        );
        assert_eq!(
            resolve(
                &scope,
                Action::Create,
                Resource::ProgramManagement,
                &Ownership::Program("bio-msc".into())
            ),
            Decision::Forbidden
        );
    }

    #[test]
    fn test_approver_flag_gates_approval_grants() {
        let manager = program_manager("cs-msc", false);
        let approver = program_manager("cs-msc", true);
        let target = Ownership::ProgramApproval("cs-msc".into());
        assert_eq!(
            resolve(&manager, Action::Create, Resource::ProgramManagement, &target),
            Decision::Forbidden
        );
        assert_eq!(
            resolve(&approver, Action::Create, Resource::ProgramManagement, &target),
            Decision::Allow
        );
    }

    #[test]
    fn test_supervisor_reads_and_updates_own_thesis_only() {
        let scope = employee("alice");
        let own = Ownership::Thesis {
            program_id: "cs-msc".into(),
            supervisor_ids: vec!["alice".into(), "bob".into()],
        };
        let other = Ownership::Thesis {
            program_id: "cs-msc".into(),
            supervisor_ids: vec!["bob".into()],
        };
        assert_eq!(
            resolve(&scope, Action::Read, Resource::Thesis, &own),
            Decision::Allow
        );
        assert_eq!(
            resolve(&scope, Action::Update, Resource::Thesis, &own),
            Decision::Allow
        );
        // Out-of-scope theses do not exist as far as the caller knows.
        assert_eq!(
            resolve(&scope, Action::Read, Resource::Thesis, &other),
            Decision::NotFound
        );
        // Supervisors cannot delete; that stays with managers and admins.
        assert_eq!(
            resolve(&scope, Action::Delete, Resource::Thesis, &own),
            Decision::NotFound
        );
    }

    #[test]
    fn test_manager_covers_theses_of_managed_program() {
        let scope = program_manager("cs-msc", false);
        let thesis = Ownership::Thesis {
            program_id: "cs-msc".into(),
            supervisor_ids: vec!["someone-else".into()],
        };
        assert_eq!(
            resolve(&scope, Action::Delete, Resource::Thesis, &thesis),
            Decision::Allow
        );
    }

    #[test]
    fn test_list_filter_shapes() {
        assert_eq!(list_filter(&admin(), Resource::Thesis), ListFilter::All);

        let scope = department_admin("math");
        assert_eq!(
            list_filter(&scope, Resource::Department),
            ListFilter::Departments(HashSet::from(["math".to_string()]))
        );

        let scope = employee("alice");
        assert_eq!(
            list_filter(&scope, Resource::Thesis),
            ListFilter::ProgramsOrSupervised {
                programs: HashSet::new(),
                user_id: "alice".into(),
            }
        );
    }
}
