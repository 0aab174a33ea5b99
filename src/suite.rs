//! Suite and test-case registration.
//!
//! Tests are registered explicitly; there is no discovery. Order of registration is order of execution.

use std::fmt;

use crate::context::TestContext;

/// Setup or teardown callback of a test case.
pub type Fixture = Box<dyn FnMut()>;

/// A named test body.
pub struct TestFunction {
    name: String,
    body: Box<dyn Fn(&TestContext)>,
}

impl TestFunction {
    pub fn new(name: impl Into<String>, body: impl Fn(&TestContext) + 'static) -> Self {
        Self {
            name: name.into(),
            body: Box::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn call(&self, ctx: &TestContext) {
        (self.body)(ctx)
    }
}

impl fmt::Debug for TestFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestFunction").field("name", &self.name).finish_non_exhaustive()
    }
}

/// A named group of test functions sharing optional setup/teardown.
///
/// Setup and teardown run once per test case, in the runner's own process, never isolated.
pub struct TestCase {
    name: String,
    tests: Vec<TestFunction>,
    setup: Option<Fixture>,
    teardown: Option<Fixture>,
}

impl TestCase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tests: Vec::new(),
            setup: None,
            teardown: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tests(&self) -> &[TestFunction] {
        &self.tests
    }

    /// Append a test function.
    pub fn add_test(&mut self, name: impl Into<String>, body: impl Fn(&TestContext) + 'static) -> &mut Self {
        self.tests.push(TestFunction::new(name, body));
        self
    }

    /// Builder form of [`TestCase::add_test`].
    pub fn with_test(mut self, name: impl Into<String>, body: impl Fn(&TestContext) + 'static) -> Self {
        self.add_test(name, body);
        self
    }

    /// Set both fixture callbacks at once.
    pub fn set_fixture(&mut self, setup: impl FnMut() + 'static, teardown: impl FnMut() + 'static) -> &mut Self {
        self.setup = Some(Box::new(setup));
        self.teardown = Some(Box::new(teardown));
        self
    }

    pub fn set_setup(&mut self, setup: impl FnMut() + 'static) -> &mut Self {
        self.setup = Some(Box::new(setup));
        self
    }

    pub fn set_teardown(&mut self, teardown: impl FnMut() + 'static) -> &mut Self {
        self.teardown = Some(Box::new(teardown));
        self
    }

    pub(crate) fn parts_mut(&mut self) -> (&str, &[TestFunction], Option<&mut Fixture>, Option<&mut Fixture>) {
        (&self.name, &self.tests, self.setup.as_mut(), self.teardown.as_mut())
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("name", &self.name)
            .field("tests", &self.tests)
            .field("has_setup", &self.setup.is_some())
            .field("has_teardown", &self.teardown.is_some())
            .finish()
    }
}

/// A named group of test cases.
#[derive(Debug)]
pub struct Suite {
    name: String,
    cases: Vec<TestCase>,
}

impl Suite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cases: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn test_cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn add_test_case(&mut self, case: TestCase) -> &mut Self {
        self.cases.push(case);
        self
    }

    /// Builder form of [`Suite::add_test_case`].
    pub fn with_test_case(mut self, case: TestCase) -> Self {
        self.cases.push(case);
        self
    }

    /// Total number of registered test functions.
    pub fn test_count(&self) -> usize {
        self.cases.iter().map(|c| c.tests.len()).sum()
    }

    pub(crate) fn split_mut(&mut self) -> (&str, &mut [TestCase]) {
        (&self.name, &mut self.cases)
    }
}

/// Register a test function under its own identifier.
///
/// `add_test!(case, test_parse)` is `case.add_test("test_parse", test_parse)`.
#[macro_export]
macro_rules! add_test {
    ($case:expr, $test:path) => {
        $case.add_test(stringify!($test), $test)
    };
}
