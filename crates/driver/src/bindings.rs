use ethers::prelude::abigen;

// Generates the bindings for the `FaultDisputeGame` contract.
abigen!(
    FaultDisputeGame,
    r"[
        struct OutputRootProof { bytes32 version; bytes32 stateRoot; bytes32 messagePasserStorageRoot; bytes32 latestBlockhash; }
        function claimDataLen() external view returns (uint256)
        function claimData(uint256 _index) external view returns (uint32 parentIndex, address counteredBy, address claimant, uint128 bond, bytes32 claim, uint128 position, uint128 clock)
        function status() external view returns (uint8)
        function resolve() external returns (uint8)
        function resolveClaim(uint256 _claimIndex, uint256 _numToResolve) external
        function move(bytes32 _disputed, uint256 _challengeIndex, bytes32 _claim, bool _isAttack) external payable
        function step(uint256 _claimIndex, bool _isAttack, bytes calldata _stateData, bytes calldata _proof) external
        function addLocalData(uint256 _ident, uint256 _execLeafIdx, uint256 _partOffset) external
        function getRequiredBond(uint128 _position) external view returns (uint256)
        function clockExtension() external view returns (uint64)
        function maxClockDuration() external view returns (uint64)
        function maxGameDepth() external view returns (uint256)
        function splitDepth() external view returns (uint256)
        function vm() external view returns (address)
        function gameType() external view returns (uint32)
        function l2BlockNumberChallenged() external view returns (bool)
        function challengeRootL2Block(OutputRootProof _outputRootProof, bytes calldata _headerRLP) external payable
    ]"
);

// Generates the bindings for the `IBigStepper` VM interface.
abigen!(
    BigStepper,
    r"[
        function oracle() external view returns (address)
    ]"
);

// Generates the bindings for the `PreimageOracle` contract.
abigen!(
    PreimageOracle,
    r"[
        function loadKeccak256PreimagePart(uint256 _partOffset, bytes calldata _preimage) external
        function loadSha256PreimagePart(uint256 _partOffset, bytes calldata _preimage) external
        function loadBlobPreimagePart(uint256 _z, uint256 _y, bytes calldata _commitment, bytes calldata _proof, uint256 _partOffset) external
        function loadPrecompilePreimagePart(uint256 _partOffset, address _precompile, uint64 _requiredGas, bytes calldata _input) external
        function preimagePartOk(bytes32 _key, uint256 _partOffset) external view returns (bool)
    ]"
);
