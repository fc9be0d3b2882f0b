use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use satsolver_evr::ranges_intersect;

use super::request::Selector;
use crate::error::{Result, SolverError};
use crate::pool::{DepId, Pool, SolvableId};

/// Resolves dependencies to the solvables satisfying them.
///
/// Results are cached per dependency id for the lifetime of the matcher,
/// which borrows the pool immutably and so cannot outlive a mutation of it.
pub struct Matcher<'p> {
    pool: &'p Pool,
    providers: RefCell<HashMap<DepId, Rc<[SolvableId]>>>,
    obsoleted: RefCell<HashMap<DepId, Rc<[SolvableId]>>>,
}

impl<'p> Matcher<'p> {
    pub fn new(pool: &'p Pool) -> Self {
        Self {
            pool,
            providers: RefCell::new(HashMap::new()),
            obsoleted: RefCell::new(HashMap::new()),
        }
    }

    pub fn pool(&self) -> &'p Pool {
        self.pool
    }

    /// Installable solvables with a provide satisfying `dep`, in id order
    pub fn providers_of(&self, dep: DepId) -> Rc<[SolvableId]> {
        if let Some(cached) = self.providers.borrow().get(&dep) {
            return Rc::clone(cached);
        }
        let computed: Rc<[SolvableId]> = self.compute_providers(dep).into();
        self.providers.borrow_mut().insert(dep, Rc::clone(&computed));
        computed
    }

    fn compute_providers(&self, dep: DepId) -> Vec<SolvableId> {
        let pool = self.pool;
        let wanted = pool.dependency(dep);

        let mut result = Vec::new();
        for &id in pool.whatprovides_name(wanted.name) {
            if !pool.is_installable(id) {
                continue;
            }
            let Ok(solvable) = pool.solvable(id) else {
                continue;
            };
            if wanted.arch.is_some_and(|arch| arch != solvable.arch) {
                continue;
            }

            let matched = match &wanted.constraint {
                None => true,
                Some((op, evr)) => solvable.provides().iter().any(|p| {
                    let provide = pool.dependency(*p);
                    if provide.name != wanted.name {
                        return false;
                    }
                    match &provide.constraint {
                        // Unversioned provides satisfy every version
                        None => true,
                        Some((pop, pevr)) => ranges_intersect(*pop, pevr, *op, evr),
                    }
                }),
            };

            if matched {
                result.push(id);
            }
        }

        result.sort_unstable();
        result.dedup();
        result
    }

    /// Installable solvables whose own name and version match an obsoletes
    /// dependency
    pub fn obsoleted_by(&self, dep: DepId) -> Rc<[SolvableId]> {
        if let Some(cached) = self.obsoleted.borrow().get(&dep) {
            return Rc::clone(cached);
        }
        let pool = self.pool;
        let name = pool.dependency(dep).name;
        let computed: Rc<[SolvableId]> = pool
            .solvables_named(name)
            .iter()
            .copied()
            .filter(|&id| pool.is_installable(id) && pool.matches_name_dep(id, dep))
            .collect::<Vec<_>>()
            .into();
        self.obsoleted.borrow_mut().insert(dep, Rc::clone(&computed));
        computed
    }

    /// Solvables a job selector refers to.
    ///
    /// Naming a solvable that does not exist, or whose repository was
    /// removed, is an error; a dependency matching nothing is not.
    pub fn select(&self, selector: &Selector) -> Result<Vec<SolvableId>> {
        match *selector {
            Selector::Solvable(id) => {
                if !self.pool.is_live(id) {
                    return Err(SolverError::InvalidSolvable(id));
                }
                Ok(vec![id])
            }
            Selector::Provides(dep) => {
                self.check_dep(dep)?;
                Ok(self.providers_of(dep).to_vec())
            }
            Selector::Name(dep) => {
                self.check_dep(dep)?;
                let pool = self.pool;
                let name = pool.dependency(dep).name;
                Ok(pool
                    .solvables_named(name)
                    .iter()
                    .copied()
                    .filter(|&id| pool.is_installable(id) && pool.matches_name_dep(id, dep))
                    .collect())
            }
        }
    }

    fn check_dep(&self, dep: DepId) -> Result<()> {
        if dep.index() >= self.pool.dep_count() {
            return Err(SolverError::InvalidJob(format!("unknown dependency id {}", dep.index())));
        }
        Ok(())
    }

    /// Whether `selector` matches `id`, without the installability filter
    pub fn selector_matches(&self, selector: &Selector, id: SolvableId) -> bool {
        match *selector {
            Selector::Solvable(s) => s == id,
            Selector::Provides(dep) => self.providers_of(dep).contains(&id),
            Selector::Name(dep) => self.pool.matches_name_dep(id, dep),
        }
    }

    /// Number of cached provider lists
    pub fn cached(&self) -> usize {
        self.providers.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::SolvableRecord;

    fn pool_with(records: Vec<SolvableRecord>) -> (Pool, Vec<SolvableId>) {
        let mut pool = Pool::new();
        let repo = pool.add_repository("test", 0);
        let ids = records
            .into_iter()
            .map(|r| pool.add_solvable(repo, r).unwrap())
            .collect();
        (pool, ids)
    }

    #[test]
    fn test_providers_versioned() {
        let (mut pool, ids) = pool_with(vec![
            SolvableRecord::new("b", "1.0", "noarch"),
            SolvableRecord::new("b", "2.0", "noarch"),
            SolvableRecord::new("b", "3.0", "noarch"),
        ]);
        let dep = pool.parse_dep("b >= 2.0").unwrap();
        let matcher = Matcher::new(&pool);
        assert_eq!(&*matcher.providers_of(dep), &[ids[1], ids[2]]);
    }

    #[test]
    fn test_providers_unversioned_matches_all() {
        let (mut pool, ids) = pool_with(vec![
            SolvableRecord::new("b", "1.0", "noarch"),
            SolvableRecord::new("c", "1.0", "noarch").provides("b"),
        ]);
        let dep = pool.parse_dep("b").unwrap();
        let matcher = Matcher::new(&pool);
        assert_eq!(&*matcher.providers_of(dep), &[ids[0], ids[1]]);
    }

    #[test]
    fn test_unversioned_provide_matches_versioned_require() {
        let (mut pool, ids) = pool_with(vec![
            SolvableRecord::new("mta", "1.0", "noarch").provides("smtp"),
        ]);
        let dep = pool.parse_dep("smtp >= 5").unwrap();
        let matcher = Matcher::new(&pool);
        assert_eq!(&*matcher.providers_of(dep), &[ids[0]]);
    }

    #[test]
    fn test_providers_are_cached() {
        let (mut pool, _) = pool_with(vec![SolvableRecord::new("a", "1", "noarch")]);
        let dep = pool.parse_dep("a").unwrap();
        let matcher = Matcher::new(&pool);
        let first = matcher.providers_of(dep);
        let second = matcher.providers_of(dep);
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(matcher.cached(), 1);
    }

    #[test]
    fn test_arch_post_filter() {
        let (mut pool, ids) = pool_with(vec![
            SolvableRecord::new("lib", "1", "x86_64"),
            SolvableRecord::new("lib", "1", "i686"),
            SolvableRecord::new("lib", "1", "ppc64"),
        ]);
        pool.set_architecture("x86_64");
        let any = pool.parse_dep("lib").unwrap();
        let only_i686 = pool.parse_dep("lib.i686").unwrap();
        let matcher = Matcher::new(&pool);
        assert_eq!(&*matcher.providers_of(any), &[ids[0], ids[1]]);
        assert_eq!(&*matcher.providers_of(only_i686), &[ids[1]]);
    }

    #[test]
    fn test_obsoleted_by_ignores_provides() {
        let (mut pool, ids) = pool_with(vec![
            SolvableRecord::new("old", "1.0", "noarch"),
            SolvableRecord::new("other", "1.0", "noarch").provides("old"),
        ]);
        let dep = pool.parse_dep("old < 2").unwrap();
        let matcher = Matcher::new(&pool);
        assert_eq!(&*matcher.obsoleted_by(dep), &[ids[0]]);
    }

    #[test]
    fn test_select_unknown_solvable() {
        let (pool, _) = pool_with(vec![SolvableRecord::new("a", "1", "noarch")]);
        let matcher = Matcher::new(&pool);
        assert!(matches!(
            matcher.select(&Selector::Solvable(42)),
            Err(SolverError::InvalidSolvable(42))
        ));
    }

    #[test]
    fn test_select_name_ignores_other_providers() {
        let (mut pool, ids) = pool_with(vec![
            SolvableRecord::new("a", "1", "noarch"),
            SolvableRecord::new("b", "1", "noarch").provides("a"),
        ]);
        let dep = pool.parse_dep("a").unwrap();
        let matcher = Matcher::new(&pool);
        assert_eq!(matcher.select(&Selector::Name(dep)).unwrap(), vec![ids[0]]);
        assert_eq!(matcher.select(&Selector::Provides(dep)).unwrap(), ids);
    }

    #[test]
    fn test_removed_repository_drops_providers() {
        let mut pool = Pool::new();
        let first = pool.add_repository("first", 0);
        let second = pool.add_repository("second", 0);
        let kept = pool.add_solvable(first, SolvableRecord::new("a", "1", "noarch")).unwrap();
        let gone = pool.add_solvable(second, SolvableRecord::new("a", "2", "noarch")).unwrap();
        pool.remove_repository(second).unwrap();
        let dep = pool.parse_dep("a").unwrap();

        let matcher = Matcher::new(&pool);
        assert_eq!(&*matcher.providers_of(dep), &[kept]);
        assert!(matcher.select(&Selector::Solvable(gone)).is_err());
    }
}
