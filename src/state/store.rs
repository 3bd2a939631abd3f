use tokio::sync::watch;

/// Single source of truth for one collection.
///
/// Every change goes through [`Store::update`] or [`Store::replace`], which
/// publish the new value to all subscribers in one step. Views hold a
/// [`watch::Receiver`] and only read.
#[derive(Debug)]
pub struct Store<S> {
    tx: watch::Sender<S>,
}

impl<S: Default> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S> Store<S> {
    pub fn new(initial: S) -> Self {
        Self {
            tx: watch::Sender::new(initial),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.tx.subscribe()
    }

    /// Read the current value without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Mutate and publish in one step.
    pub fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut out = None;
        self.tx.send_modify(|state| out = Some(f(state)));
        match out {
            Some(out) => out,
            None => unreachable!("send_modify always runs its closure"),
        }
    }

    pub fn replace(&self, value: S) -> S {
        self.tx.send_replace(value)
    }
}

impl<S: Clone> Store<S> {
    pub fn snapshot(&self) -> S {
        self.tx.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_each_update() {
        let store = Store::new(vec![1, 2]);
        let mut rx = store.subscribe();

        store.update(|v| v.push(3));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), vec![1, 2, 3]);

        let old = store.replace(vec![]);
        assert_eq!(old, vec![1, 2, 3]);
        assert!(rx.has_changed().unwrap());
    }

    #[test]
    fn update_returns_closure_value() {
        let store = Store::new(5);
        let doubled = store.update(|n| {
            *n *= 2;
            *n
        });
        assert_eq!(doubled, 10);
        assert_eq!(store.snapshot(), 10);
    }
}
