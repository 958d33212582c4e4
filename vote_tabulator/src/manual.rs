/*!

This is the long-form manual for `vote_tabulator` and `vtab`.

## Overview

A tabulation starts from two definition documents:
* the jurisdiction: its districts and its precincts
* the election: contests and their candidates, questions and their answers,
  counters (the machines or teams submitting counts), reporting groups and the
  expected counts

Counter counts are then submitted one by one. Each one carries the votes of
one counter, for one reporting group, in one precinct. A counter count must
cover every contest, candidate, question and answer of the election, even with
zero votes.

All the documents are JSON. Identifiers (UIDs) may be written as strings or
as numbers: `17` and `"17"` are the same UID.

## Jurisdiction

```json
{
  "ident": "J1",
  "display_name": "Springfield",
  "district_list": [
    {"ident": "D1", "display_name": "City", "district_type": "municipal"}
  ],
  "precinct_list": [
    {"ident": "P1", "display_name": "North"},
    {"ident": "P2"}
  ]
}
```

## Election

```json
{
  "ident": "E1",
  "display_name": "Municipal election",
  "start_date": "2022-11-08",
  "contest_list": [{"ident": "MAYOR", "district_ident": "D1"}],
  "candidate_list": [
    {"ident": "ANNA", "contest_ident": "MAYOR", "party_ident": "Green"},
    {"ident": "BOB", "contest_ident": "MAYOR"}
  ],
  "question_list": [
    {"ident": "Q1", "district_ident": "D1", "question": "Build the bridge?",
     "answer_list": ["Yes", "No"]}
  ],
  "counter_list": [{"ident": "C1"}],
  "reporting_group_list": ["Normal", "Absentee"],
  "expected_count_list": [
    {"counter_ident": "C1", "reporting_group": "Normal",
     "precinct_ident_list": ["P1", "P2"]}
  ]
}
```

Every expected count declares that one counter will send one counter count per
listed precinct for the given reporting group. The tabulation is `DONE` once
all the declared counter counts have been received.

## Counter count

```json
{
  "counter_ident": "C1",
  "reporting_group": "Normal",
  "precinct_ident": "P1",
  "jurisdiction_ident": "J1",
  "election_ident": "E1",
  "file_ident": "C1-normal-p1-001",
  "contest_count_list": [
    {"contest_ident": "MAYOR", "overvote_count": 1, "undervote_count": 0,
     "writein_count": 2,
     "candidate_count_list": [
       {"candidate_ident": "ANNA", "count": 120},
       {"candidate_ident": "BOB", "count": 98}
     ]}
  ],
  "question_count_list": [
    {"question_ident": "Q1", "overvote_count": 0, "undervote_count": 3,
     "answer_count_list": [
       {"answer": "Yes", "count": 150}, {"answer": "No", "count": 68}
     ]}
  ]
}
```

The `file_ident` must be unique across the tabulation. A second counter count
for the same (counter, reporting group, precinct) is rejected.

## Errors and warnings

Every validation produces a list of errors and a list of warnings, as plain
sentences such as:

```text
Non-Existent District UID (D9) for Contest UID (MAYOR)
Duplicate Counter Count (C1, Normal, P1) Input to Tabulator
```

The sentences are stable: they are stored with the definitions and the counter
counts, and compared again when a tabulation is reloaded.

A counter count with at least one error is not added to the tallies. Warnings
never block a counter count. A counter count that would push a running total
past the largest count is rejected with `Count Overflow (CAND_1) in Counter
Count (F2)`. Definitions with errors still build a tabulator,
but `vtab` refuses to go further.

## Tabulation state

The state of a tabulation is saved as one JSON document holding the
definitions (with their errors and warnings), the tallies, every accepted
counter count (with its warnings) and the state label (`INITIAL`,
`ACCUMULATING` or `DONE`).

When a state is loaded, the whole history is replayed. Any difference between
the stored and the recomputed errors, warnings, tallies or state label stops
the program.

## Command line

```text
vtab --jurisdiction jurisdiction.json --election election.json \
     --counts c1_p1.json --counts c1_p2.json --out state.json
vtab --state state.json --counts late.json --out state.json
vtab --config tabulation.json --reference expected_summary.json
```

The tabulation config lists the same inputs, relative to its own directory:

```json
{
  "jurisdictionPath": "jurisdiction.json",
  "electionPath": "election.json",
  "counterCountPaths": ["c1_p1.json", "c1_p2.json"],
  "outputPath": "state.json"
}
```

The summary printed at the end (and compared to the `--reference` file) has
this shape:

```json
{
  "state": "DONE",
  "totalExpected": 2,
  "missing": [],
  "finished": ["P1", "P2"],
  "errors": [],
  "warnings": [],
  "contests": {"MAYOR": {"overvote": "1", "undervote": "0", "writein": "2",
                          "tally": {"ANNA": "120", "BOB": "98"}}},
  "questions": {"Q1": {"overvote": "0", "undervote": "3",
                       "tally": {"Yes": "150", "No": "68"}}}
}
```

*/
