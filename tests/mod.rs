mod report_cycle;
mod smoke_tests;

// Integration tests, grouped by concern:
// - report_cycle: several runs against a mock calendar and a recording notifier
// - smoke_tests: the shipped report catalogue and the component registry
