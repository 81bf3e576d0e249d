/*!

# Networking Interfaces and Methods

## Introduction

The client talks to an Ogmios node over a single websocket, using the JSON-WSP
envelope. Every frame is one JSON object. Requests go out as
`jsonwsp/request`, answers come back as `jsonwsp/response` (or
`jsonwsp/fault` when the peer rejects a request).

The `RequestMessage` and `ResponseMessage` types carry this data.

## Envelope

```json
{
  "type": "jsonwsp/request",
  "version": "1.0",
  "servicename": "ogmios",
  "methodname": "RequestNext",
  "args": {},
  "mirror": { "id": 42 }
}
```

`mirror` is optional and echoed back verbatim as `reflection`. We use it to
match responses to requests, similar to the ID in JSON-RPC. Every request
this client sends carries a fresh id.

## Methods

```text
Query
FindIntersect
RequestNext
```

### Query

Only `{ "query": "chainTip" }` is used, to turn a "tip" start point into a
concrete `{ slot, hash }` before negotiating.

### FindIntersect

`{ "points": [...] }`. The result is either `IntersectionFound` with the
agreed point, or `IntersectionNotFound`, which ends the session.

### RequestNext

No arguments. The result is `RollForward` with the next block, or
`RollBackward` with the point the chain reorganized back to. Requests are
pipelined: the session keeps a fixed number outstanding and sends one
replacement after dispatching each reply.

## Sessions

A dedicated reader task parses inbound frames and forwards them into one
ordered channel (`transport`). The session (`client`) is the only consumer of
that channel and the only writer to the socket.

*/

pub mod api_message;
pub mod client;
pub mod signals;
pub mod transport;
